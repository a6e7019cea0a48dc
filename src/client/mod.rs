//! MakerPass REST client.
//!
//! `ApiClient` is the single transport for every upstream call. It exposes the
//! generic `get/post/put/patch/delete(path, token)` accessors that the named
//! endpoint bindings in [`resources`] are composed from, plus `auth_token` which
//! resolves a credential into an [`Identity`] via `GET /me`.
//!
//! There is no caching and no retry: each call is one request and any failure
//! is returned to the caller as an [`UpstreamError`].

pub mod resources;
mod types;

pub use types::{Connection, Connections, GroupAccess, Identity};

use anyhow::{anyhow, Context};
use reqwest::{header::AUTHORIZATION, Client, Method, StatusCode};
use serde_json::Value;
use std::{future::Future, pin::Pin};
use thiserror::Error;
use tracing::{debug, info_span, instrument, Instrument};
use url::Url;

use crate::APP_USER_AGENT;

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-2xx status.
    #[error("{url} - {status}")]
    Status {
        url: String,
        status: StatusCode,
        body: Value,
    },
    /// The request never produced a response (connect, TLS, body read).
    #[error("{url} - request failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// An identifier that cannot be used as a single path segment; nothing was sent.
    #[error("invalid identifier: {id:?}")]
    InvalidId { id: String },
    /// A 2xx response whose body did not have the expected shape.
    #[error("{url} - unexpected response body: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl UpstreamError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Upstream's own description of the failure: the body's `message` field, a
    /// plain string body, or the whole body. Falls back to the status reason.
    #[must_use]
    pub fn message(&self) -> Value {
        match self {
            Self::Status { status, body, .. } => match body {
                Value::Object(map) => map
                    .get("message")
                    .filter(|message| !message.is_null())
                    .cloned()
                    .unwrap_or_else(|| body.clone()),
                Value::Null => Value::String(
                    status
                        .canonical_reason()
                        .unwrap_or("upstream_error")
                        .to_string(),
                ),
                _ => body.clone(),
            },
            other => Value::String(other.to_string()),
        }
    }
}

pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, UpstreamError>> + Send + 'a>>;

/// Upstream lookups the middleware depends on.
///
/// `ApiClient` is the production implementation; tests and embedders can supply
/// their own.
pub trait IdentityProvider: Send + Sync {
    fn resolve_identity<'a>(&'a self, token: &'a str) -> ProviderFuture<'a, Identity>;

    fn fetch_group_access<'a>(
        &'a self,
        group_id: &'a str,
        token: &'a str,
    ) -> ProviderFuture<'a, GroupAccess>;

    fn fetch_user_connections<'a>(
        &'a self,
        user_id: &'a str,
        token: &'a str,
    ) -> ProviderFuture<'a, Connections>;
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    host: String,
}

impl ApiClient {
    /// Build a client for `host` (e.g. `https://api.makerpass.com`).
    /// # Errors
    /// Returns an error if the host is not an absolute http(s) URL or the HTTP client cannot be built.
    pub fn new(host: &str) -> anyhow::Result<Self> {
        let http = Client::builder().user_agent(APP_USER_AGENT).build()?;
        Self::with_http_client(host, http)
    }

    /// Build a client that shares an existing `reqwest::Client` (and its pool).
    /// # Errors
    /// Returns an error if the host is not an absolute http(s) URL.
    pub fn with_http_client(host: &str, http: Client) -> anyhow::Result<Self> {
        let url = Url::parse(host).with_context(|| format!("Invalid API host: {host}"))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(anyhow!("Error parsing API host: unsupported scheme {scheme}")),
        }

        if url.host_str().is_none() {
            return Err(anyhow!("Error parsing API host: no host specified"));
        }

        Ok(Self {
            http,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.host)
        } else {
            format!("{}/{path}", self.host)
        }
    }

    /// Issue `method path` with `Authorization: bearer <token>` and return the parsed body.
    /// # Errors
    /// Returns an [`UpstreamError`] on transport failure, non-2xx status, or a non-JSON body.
    #[instrument(skip(self, token))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: &str,
    ) -> Result<Value, UpstreamError> {
        self.send(method, path, &format!("bearer {token}")).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn get(&self, path: &str, token: &str) -> Result<Value, UpstreamError> {
        self.request(Method::GET, path, token).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn post(&self, path: &str, token: &str) -> Result<Value, UpstreamError> {
        self.request(Method::POST, path, token).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn put(&self, path: &str, token: &str) -> Result<Value, UpstreamError> {
        self.request(Method::PUT, path, token).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn patch(&self, path: &str, token: &str) -> Result<Value, UpstreamError> {
        self.request(Method::PATCH, path, token).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn delete(&self, path: &str, token: &str) -> Result<Value, UpstreamError> {
        self.request(Method::DELETE, path, token).await
    }

    /// Resolve a credential into the caller's identity and scopes (`GET /me`).
    /// # Errors
    /// Returns [`UpstreamError::Status`] with upstream's status and body when the token is rejected.
    #[instrument(skip_all)]
    pub async fn auth_token(&self, token: &str) -> Result<Identity, UpstreamError> {
        let body = self
            .send(Method::GET, "/me", &format!("Bearer {token}"))
            .await?;

        serde_json::from_value(body).map_err(|source| UpstreamError::Decode {
            url: self.endpoint_url("/me"),
            source,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        authorization: &str,
    ) -> Result<Value, UpstreamError> {
        let url = self.endpoint_url(path);

        let span = info_span!(
            "makerpass.request",
            http.method = %method,
            url = %url
        );
        let response = self
            .http
            .request(method, &url)
            .header(AUTHORIZATION, authorization)
            .send()
            .instrument(span)
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            debug!("{} - {}", url, status);

            return Err(UpstreamError::Status {
                url,
                status,
                body: error_body(&bytes),
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|source| UpstreamError::Decode { url, source })
    }
}

impl IdentityProvider for ApiClient {
    fn resolve_identity<'a>(&'a self, token: &'a str) -> ProviderFuture<'a, Identity> {
        Box::pin(self.auth_token(token))
    }

    fn fetch_group_access<'a>(
        &'a self,
        group_id: &'a str,
        token: &'a str,
    ) -> ProviderFuture<'a, GroupAccess> {
        Box::pin(self.me_group_access(group_id, token))
    }

    fn fetch_user_connections<'a>(
        &'a self,
        user_id: &'a str,
        token: &'a str,
    ) -> ProviderFuture<'a, Connections> {
        Box::pin(self.user_connections(user_id, token))
    }
}

// Error bodies are passed through verbatim, so keep non-JSON ones as a string.
fn error_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
