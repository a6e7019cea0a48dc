//! Request authentication and authorization for axum routers.
//!
//! Layering order matters: gates read what the [`Authenticator`] stored, so the
//! authenticator must wrap them (apply gates first, then the authenticator).
//!
//! Request extensions used:
//! - [`Session`]: read, inserted by an outer session layer.
//! - [`Credential`]: inserted before the identity lookup.
//! - [`Identity`](crate::client::Identity): inserted after a successful lookup.

mod credential;
mod error;
mod gates;
mod options;
mod resolve;

pub use credential::{extract_bearer_token, Credential, Session};
pub use error::AuthError;
pub use gates::{
    require_membership, require_scope, require_user_connection, RequireMembership, RequireScope,
    RequireUserConnection,
};
pub use options::{AuthOptions, ConnectionOptions, MembershipOptions, Roles};
pub use resolve::{authenticate, Authenticator, CredentialSource};
