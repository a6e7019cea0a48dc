use axum::{
    extract::{Extension, Path},
    response::Response,
};

use super::relay;
use crate::{auth::Credential, client::ApiClient};

pub async fn group(
    Path(group_uid): Path<String>,
    client: Extension<ApiClient>,
    credential: Extension<Credential>,
) -> Response {
    relay(client.group(&group_uid, credential.expose()).await)
}

pub async fn group_memberships(
    Path(group_uid): Path<String>,
    client: Extension<ApiClient>,
    credential: Extension<Credential>,
) -> Response {
    relay(client.group_memberships(&group_uid, credential.expose()).await)
}
