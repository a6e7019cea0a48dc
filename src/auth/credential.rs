//! Credentials and where they come from.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// The bearer token resolved for this request, whichever source it came from.
///
/// Stored in the request extensions before the upstream call so later gates can
/// reuse it for their own lookups.
#[derive(Clone, Debug)]
pub struct Credential(SecretString);

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Session data made available by an outer session layer.
///
/// Only the property named by `AuthOptions::session_key` is read.
#[derive(Clone, Debug, Default)]
pub struct Session {
    values: HashMap<String, String>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Non-empty token stored under `key`.
    #[must_use]
    pub fn token(&self, key: &str) -> Option<Credential> {
        self.get(key)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Credential::new)
    }
}

/// Token from `Authorization: Bearer <token>` (or `bearer <token>`).
///
/// Returns `None` for a missing header, another scheme, or an empty token.
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<Credential> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(Credential::new(token))
    }
}
