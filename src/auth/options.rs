//! Middleware configuration, built once and never mutated afterwards.

use axum::http::{header::InvalidHeaderValue, HeaderValue};
use serde::Serialize;

const DEFAULT_SESSION_KEY: &str = "accessToken";
const DEFAULT_USER_PARAM_KEY: &str = "user_uid";
const DEFAULT_SCHOOL_ADMIN_ROLES: [&str; 2] = ["owner", "collaborator"];

#[derive(Clone, Debug)]
pub struct AuthOptions {
    required: bool,
    redirect_on_failure: Option<String>,
    session_key: String,
    preset_identity: bool,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            required: true,
            redirect_on_failure: None,
            session_key: DEFAULT_SESSION_KEY.to_string(),
            preset_identity: false,
        }
    }

    /// When `false`, a failed lookup still forwards the request without an identity.
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Redirect here instead of relaying the upstream error (browser callers only).
    ///
    /// # Errors
    /// Returns an error if `url` cannot be sent as a `Location` header value.
    pub fn with_redirect_on_failure(
        mut self,
        url: impl Into<String>,
    ) -> Result<Self, InvalidHeaderValue> {
        let url = url.into();
        HeaderValue::from_str(&url)?;
        self.redirect_on_failure = Some(url);
        Ok(self)
    }

    /// Session property holding the access token.
    #[must_use]
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// Skip credential resolution and expect an `Identity` already attached to
    /// the request. Intended for test harnesses.
    #[must_use]
    pub fn with_preset_identity(mut self, preset: bool) -> Self {
        self.preset_identity = preset;
        self
    }

    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn redirect_on_failure(&self) -> Option<&str> {
        self.redirect_on_failure.as_deref()
    }

    #[must_use]
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    #[must_use]
    pub fn preset_identity(&self) -> bool {
        self.preset_identity
    }

    /// What to do when the lookup fails for this particular request.
    ///
    /// Bearer callers are programmatic, so they never get redirected.
    pub(crate) fn failure_policy(&self, bearer_present: bool) -> FailurePolicy<'_> {
        FailurePolicy {
            required: self.required,
            redirect_on_failure: if bearer_present {
                None
            } else {
                self.redirect_on_failure()
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FailurePolicy<'a> {
    pub(crate) required: bool,
    pub(crate) redirect_on_failure: Option<&'a str>,
}

/// A normalized allow-list of role labels. Order is kept, duplicates dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Roles(Vec<String>);

impl Roles {
    #[must_use]
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for role in roles {
            let role = role.into();
            if !normalized.contains(&role) {
                normalized.push(role);
            }
        }
        Self(normalized)
    }

    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|r| r == role)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for Roles {
    fn from(role: &str) -> Self {
        Self::new([role])
    }
}

impl From<String> for Roles {
    fn from(role: String) -> Self {
        Self::new([role])
    }
}

impl From<&[&str]> for Roles {
    fn from(roles: &[&str]) -> Self {
        Self::new(roles.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Roles {
    fn from(roles: [&str; N]) -> Self {
        Self::new(roles)
    }
}

impl From<Vec<&str>> for Roles {
    fn from(roles: Vec<&str>) -> Self {
        Self::new(roles)
    }
}

impl From<Vec<String>> for Roles {
    fn from(roles: Vec<String>) -> Self {
        Self::new(roles)
    }
}

#[derive(Clone, Debug)]
pub struct MembershipOptions {
    allow_school_admins: bool,
}

impl Default for MembershipOptions {
    fn default() -> Self {
        Self {
            allow_school_admins: true,
        }
    }
}

impl MembershipOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_allow_school_admins(mut self, allow: bool) -> Self {
        self.allow_school_admins = allow;
        self
    }

    #[must_use]
    pub fn allow_school_admins(&self) -> bool {
        self.allow_school_admins
    }
}

#[derive(Clone, Debug)]
pub struct ConnectionOptions {
    role: Option<Roles>,
    school_admin_role: Option<Roles>,
    param_key: String,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            role: None,
            school_admin_role: Some(Roles::from(DEFAULT_SCHOOL_ADMIN_ROLES)),
            param_key: DEFAULT_USER_PARAM_KEY.to_string(),
        }
    }
}

impl ConnectionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a group connection with one of these roles.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<Roles>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Require a school admin connection with one of these roles.
    #[must_use]
    pub fn with_school_admin_role(mut self, role: impl Into<Roles>) -> Self {
        self.school_admin_role = Some(role.into());
        self
    }

    /// Drop the school admin requirement entirely.
    #[must_use]
    pub fn without_school_admin_role(mut self) -> Self {
        self.school_admin_role = None;
        self
    }

    /// Route parameter holding the other user's id.
    #[must_use]
    pub fn with_param_key(mut self, key: impl Into<String>) -> Self {
        self.param_key = key.into();
        self
    }

    #[must_use]
    pub fn role(&self) -> Option<&Roles> {
        self.role.as_ref()
    }

    #[must_use]
    pub fn school_admin_role(&self) -> Option<&Roles> {
        self.school_admin_role.as_ref()
    }

    #[must_use]
    pub fn param_key(&self) -> &str {
        &self.param_key
    }
}
