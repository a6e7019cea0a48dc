//! Rejections produced by authentication and the authorization gates.

use axum::{
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::client::UpstreamError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Expected rejection: rendered as `status` with a JSON body carrying `reason`.
    #[error("{status}: {body}")]
    Denied { status: StatusCode, body: Value },

    #[error("redirect to {0}")]
    Redirect(String),

    /// The middleware was wired incorrectly; never a caller problem.
    #[error("configuration error: {0}")]
    Configuration(&'static str),

    /// A non-HTTP upstream failure seen while authorizing.
    #[error(transparent)]
    Fatal(UpstreamError),
}

impl AuthError {
    #[must_use]
    pub fn unauthorized(reason: &str) -> Self {
        Self::Denied {
            status: StatusCode::UNAUTHORIZED,
            body: json!({ "reason": reason }),
        }
    }

    #[must_use]
    pub fn forbidden(body: Value) -> Self {
        Self::Denied {
            status: StatusCode::FORBIDDEN,
            body,
        }
    }

    /// Relay an identity lookup failure as-is: upstream status and body.
    pub(crate) fn upstream_verbatim(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { status, body, .. } => Self::Denied { status, body },
            UpstreamError::Transport { .. } => Self::Denied {
                status: StatusCode::BAD_GATEWAY,
                body: json!({ "reason": "upstream_unavailable" }),
            },
            other @ (UpstreamError::Decode { .. } | UpstreamError::InvalidId { .. }) => {
                Self::Fatal(other)
            }
        }
    }

    /// Translate a gate lookup failure: HTTP errors keep their status with
    /// upstream's message as the `reason`, an unusable route id is a bad
    /// request, anything else is fatal.
    pub(crate) fn upstream_reason(err: UpstreamError) -> Self {
        if let UpstreamError::InvalidId { .. } = err {
            return Self::Denied {
                status: StatusCode::BAD_REQUEST,
                body: json!({ "reason": "invalid_identifier" }),
            };
        }
        match err.status() {
            Some(status) => Self::Denied {
                status,
                body: json!({ "reason": err.message() }),
            },
            None => Self::Fatal(err),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Denied { status, body } => (status, Json(body)).into_response(),
            Self::Redirect(url) => (StatusCode::FOUND, [(LOCATION, url)]).into_response(),
            Self::Configuration(message) => {
                error!("Middleware configuration error: {}", message);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Fatal(err) => {
                error!("Unhandled upstream error: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
