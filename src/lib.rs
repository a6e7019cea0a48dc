//! # MakerPass (authentication & authorization middleware)
//!
//! `makerpass` resolves the caller behind an inbound request against the
//! MakerPass identity service and gates handlers by scope, group membership or
//! user connection.
//!
//! ## Flow
//!
//! 1. An [`auth::Authenticator`] extracts a credential (session property, bearer
//!    header, or bearer-then-session), calls `GET /me` and stores the
//!    [`auth::Credential`] and the resolved [`client::Identity`] in the request
//!    extensions.
//! 2. Authorization gates ([`auth::RequireScope`], [`auth::RequireMembership`],
//!    [`auth::RequireUserConnection`]) inspect that state, calling upstream for
//!    group access or connections when needed, and either forward the request or
//!    reject it with a JSON body carrying a machine-readable `reason`.
//!
//! ```ignore
//! let client = ApiClient::new(DEFAULT_API_HOST)?;
//! let provider: Arc<dyn IdentityProvider> = Arc::new(client.clone());
//!
//! let router = Router::new().route("/groups/:group_uid", get(handler));
//! let router = RequireMembership::new(provider.clone(), ["owner"]).apply(router);
//! let router = Authenticator::with_bearer(provider, AuthOptions::new()).apply(router);
//! ```
//!
//! ## Upstream
//!
//! Every upstream call is a single request with no caching, retry or timeout
//! override; failures are reported to the middleware immediately.

pub mod auth;
pub mod cli;
pub mod client;
pub mod server;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Base URL of the hosted MakerPass API.
pub const DEFAULT_API_HOST: &str = "https://api.makerpass.com";
