pub mod groups;
pub mod health;
pub mod me;
pub mod users;

pub use self::groups::{group, group_memberships};
pub use self::health::health;
pub use self::me::{me, me_groups, me_schools};
pub use self::users::{user, user_groups};

// common functions for the handlers
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use tracing::error;

use crate::client::UpstreamError;

/// Pass an upstream result through: the body on success, upstream's status and
/// body on an HTTP error.
pub(crate) fn relay(result: Result<Value, UpstreamError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(UpstreamError::Status { status, body, .. }) => (status, Json(body)).into_response(),
        Err(UpstreamError::InvalidId { .. }) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "reason": "invalid_identifier" })),
        )
            .into_response(),
        Err(err) => {
            error!("Upstream request failed: {}", err);

            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "reason": "upstream_unavailable" })),
            )
                .into_response()
        }
    }
}
