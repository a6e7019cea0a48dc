use axum::{
    extract::Extension,
    response::{IntoResponse, Json, Response},
};

use super::relay;
use crate::{
    auth::Credential,
    client::{ApiClient, Identity},
};

/// The resolved identity, or `null` when authentication is optional and failed.
pub async fn me(identity: Option<Extension<Identity>>) -> impl IntoResponse {
    Json(identity.map(|Extension(identity)| identity))
}

pub async fn me_groups(
    client: Extension<ApiClient>,
    credential: Extension<Credential>,
) -> Response {
    relay(client.me_groups(credential.expose()).await)
}

pub async fn me_schools(
    client: Extension<ApiClient>,
    credential: Extension<Credential>,
) -> Response {
    relay(client.me_schools(credential.expose()).await)
}
