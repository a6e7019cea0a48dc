use axum::{
    extract::{Extension, Path},
    response::Response,
};

use super::relay;
use crate::{auth::Credential, client::ApiClient};

pub async fn user(
    Path(user_uid): Path<String>,
    client: Extension<ApiClient>,
    credential: Extension<Credential>,
) -> Response {
    relay(client.user(&user_uid, credential.expose()).await)
}

pub async fn user_groups(
    Path(user_uid): Path<String>,
    client: Extension<ApiClient>,
    credential: Extension<Credential>,
) -> Response {
    relay(client.user_groups(&user_uid, credential.expose()).await)
}
