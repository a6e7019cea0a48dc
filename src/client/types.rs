//! Payloads returned by the MakerPass API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller identity returned by `GET /me`.
///
/// Inserted into the request extensions once authentication succeeds and never
/// outlives the request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub user: Value,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Identity {
    #[must_use]
    pub fn new<I, S>(user: Value, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user,
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Caller's access to a single group (`GET /me/groups/{id}/access`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAccess {
    #[serde(default)]
    pub group_role: Option<String>,
    #[serde(default)]
    pub group_uid: Option<String>,
    #[serde(default)]
    pub school_admin_role: Option<String>,
    #[serde(default)]
    pub school_uid: Option<String>,
}

impl GroupAccess {
    /// True when upstream reports any non-empty school admin role.
    #[must_use]
    pub fn is_school_admin(&self) -> bool {
        self.school_admin_role
            .as_deref()
            .is_some_and(|role| !role.is_empty())
    }
}

/// A single connection entry; only `role` is interpreted, the rest is kept as-is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Connections between the caller and another user (`GET /users/{id}/connections`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Connections {
    #[serde(default)]
    pub groups: Vec<Connection>,
    #[serde(default)]
    pub school_admin_schools: Vec<Connection>,
}
