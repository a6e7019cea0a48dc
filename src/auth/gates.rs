//! Authorization gates, mounted after an [`Authenticator`](super::Authenticator).
//!
//! Gates are attached with `Router::route_layer` so the matched route
//! parameters are visible to them.

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    Router,
};
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, instrument};

use super::{
    credential::Credential,
    error::AuthError,
    options::{ConnectionOptions, MembershipOptions, Roles},
};
use crate::client::{Connection, Identity, IdentityProvider};

const GROUP_PARAM_KEYS: [&str; 2] = ["group_id", "group_uid"];

type RouteParams = Option<Path<HashMap<String, String>>>;

fn credential(request: &Request) -> Result<Credential, AuthError> {
    request
        .extensions()
        .get::<Credential>()
        .cloned()
        .ok_or_else(|| AuthError::unauthorized("no_token"))
}

/// Every listed scope must be present on the resolved [`Identity`].
#[derive(Clone, Debug)]
pub struct RequireScope {
    scopes: Arc<[String]>,
}

impl RequireScope {
    #[must_use]
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self, require_scope))
    }
}

/// # Errors
/// `401 no_scopes` without an identity, `401 scope_required` on the first missing scope.
#[instrument(skip_all, name = "makerpass.require_scope")]
pub async fn require_scope(
    State(gate): State<RequireScope>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(identity) = request.extensions().get::<Identity>() else {
        debug!("No identity on request, scopes unavailable");
        return Err(AuthError::unauthorized("no_scopes"));
    };

    if let Some(scope) = gate.scopes.iter().find(|scope| !identity.has_scope(scope)) {
        debug!("Missing scope: {}", scope);
        return Err(AuthError::Denied {
            status: StatusCode::UNAUTHORIZED,
            body: json!({ "reason": "scope_required", "scope": scope }),
        });
    }

    Ok(next.run(request).await)
}

/// The caller must hold one of `roles` in the group named by the route.
#[derive(Clone)]
pub struct RequireMembership {
    provider: Arc<dyn IdentityProvider>,
    roles: Arc<Roles>,
    options: MembershipOptions,
}

impl RequireMembership {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, roles: impl Into<Roles>) -> Self {
        Self {
            provider,
            roles: Arc::new(roles.into()),
            options: MembershipOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: MembershipOptions) -> Self {
        self.options = options;
        self
    }

    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self, require_membership))
    }
}

/// # Errors
/// `401 no_token` without a credential, `403 not_member_of_group` when the
/// role does not match, or the upstream status when the lookup fails.
#[instrument(skip_all, name = "makerpass.require_membership")]
pub async fn require_membership(
    State(gate): State<RequireMembership>,
    params: RouteParams,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let credential = credential(&request)?;

    let params = params.map(|Path(params)| params).unwrap_or_default();
    let group_id = GROUP_PARAM_KEYS
        .iter()
        .find_map(|key| params.get(*key))
        .ok_or(AuthError::Configuration(
            "membership gate mounted on a route without a group_id or group_uid parameter",
        ))?;

    let access = gate
        .provider
        .fetch_group_access(group_id, credential.expose())
        .await
        .map_err(AuthError::upstream_reason)?;

    let role_allowed = access
        .group_role
        .as_deref()
        .is_some_and(|role| gate.roles.contains(role));
    let school_admin_allowed = gate.options.allow_school_admins() && access.is_school_admin();

    if !(role_allowed || school_admin_allowed) {
        debug!("Group {} denied for role {:?}", group_id, access.group_role);
        return Err(AuthError::forbidden(json!({ "reason": "not_member_of_group" })));
    }

    Ok(next.run(request).await)
}

/// The caller must be connected to the user named by the route.
#[derive(Clone)]
pub struct RequireUserConnection {
    provider: Arc<dyn IdentityProvider>,
    options: Arc<ConnectionOptions>,
}

impl RequireUserConnection {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, options: ConnectionOptions) -> Self {
        Self {
            provider,
            options: Arc::new(options),
        }
    }

    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self, require_user_connection))
    }
}

fn has_role(connections: &[Connection], required: &Roles) -> bool {
    connections
        .iter()
        .filter_map(|connection| connection.role.as_deref())
        .any(|role| required.contains(role))
}

/// # Errors
/// `401 no_token` without a credential, `403 invalid_connection` when a
/// required group or school admin connection is missing, or the upstream
/// status when the lookup fails.
#[instrument(skip_all, name = "makerpass.require_user_connection")]
pub async fn require_user_connection(
    State(gate): State<RequireUserConnection>,
    params: RouteParams,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let credential = credential(&request)?;

    let params = params.map(|Path(params)| params).unwrap_or_default();
    let user_id = params
        .get(gate.options.param_key())
        .ok_or(AuthError::Configuration(
            "connection gate mounted on a route without its user parameter",
        ))?;

    let connections = gate
        .provider
        .fetch_user_connections(user_id, credential.expose())
        .await
        .map_err(AuthError::upstream_reason)?;

    if let Some(required) = gate.options.role() {
        if !has_role(&connections.groups, required) {
            debug!("No group connection to user {}", user_id);
            return Err(AuthError::forbidden(json!({
                "reason": "invalid_connection",
                "type": "group",
                "required": required,
            })));
        }
    }

    if let Some(required) = gate.options.school_admin_role() {
        if !has_role(&connections.school_admin_schools, required) {
            debug!("No school admin connection to user {}", user_id);
            return Err(AuthError::forbidden(json!({
                "reason": "invalid_connection",
                "type": "school_admin",
                "required": required,
            })));
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Connections, GroupAccess, ProviderFuture, UpstreamError};
    use anyhow::Result;
    use axum::{
        body::{to_bytes, Body},
        routing::get,
    };
    use serde_json::Value;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubProvider {
        access: GroupAccess,
        connections: Connections,
        failure: Option<StatusCode>,
        lookups: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn lookups(&self) -> Vec<String> {
            self.lookups.lock().map(|l| l.clone()).unwrap_or_default()
        }

        fn record(&self, entry: String) {
            if let Ok(mut lookups) = self.lookups.lock() {
                lookups.push(entry);
            }
        }

        fn failure(&self, url: &str) -> Option<UpstreamError> {
            self.failure.map(|status| UpstreamError::Status {
                url: url.to_string(),
                status,
                body: json!({ "message": "group_not_found" }),
            })
        }
    }

    impl IdentityProvider for StubProvider {
        fn resolve_identity<'a>(&'a self, _token: &'a str) -> ProviderFuture<'a, Identity> {
            Box::pin(async { Ok(Identity::default()) })
        }

        fn fetch_group_access<'a>(
            &'a self,
            group_id: &'a str,
            token: &'a str,
        ) -> ProviderFuture<'a, GroupAccess> {
            Box::pin(async move {
                self.record(format!("access {group_id} {token}"));
                match self.failure("stub:/me/groups/access") {
                    Some(err) => Err(err),
                    None => Ok(self.access.clone()),
                }
            })
        }

        fn fetch_user_connections<'a>(
            &'a self,
            user_id: &'a str,
            token: &'a str,
        ) -> ProviderFuture<'a, Connections> {
            Box::pin(async move {
                self.record(format!("connections {user_id} {token}"));
                match self.failure("stub:/users/connections") {
                    Some(err) => Err(err),
                    None => Ok(self.connections.clone()),
                }
            })
        }
    }

    fn connection(role: &str) -> Connection {
        Connection {
            role: Some(role.to_string()),
            ..Connection::default()
        }
    }

    fn request(uri: &str, credential: Option<&str>, identity: Option<Identity>) -> Result<Request> {
        let mut request = axum::http::Request::builder().uri(uri).body(Body::empty())?;
        if let Some(token) = credential {
            request.extensions_mut().insert(Credential::new(token));
        }
        if let Some(identity) = identity {
            request.extensions_mut().insert(identity);
        }
        Ok(request)
    }

    async fn json_body(response: Response) -> Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn scoped_app(gate: RequireScope) -> Router {
        gate.apply(Router::new().route("/", get(|| async { "ok" })))
    }

    fn group_app(gate: RequireMembership) -> Router {
        gate.apply(Router::new().route("/groups/:group_uid", get(|| async { "ok" })))
    }

    fn user_app(gate: RequireUserConnection) -> Router {
        gate.apply(Router::new().route("/users/:user_uid", get(|| async { "ok" })))
    }

    #[tokio::test]
    async fn require_scope_reports_first_missing() -> Result<()> {
        let app = scoped_app(RequireScope::new(["read", "write", "admin"]));
        let identity = Identity::new(json!({}), ["read"]);

        let response = app.oneshot(request("/", None, Some(identity))?).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await?,
            json!({ "reason": "scope_required", "scope": "write" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn require_scope_passes_with_all_scopes() -> Result<()> {
        let app = scoped_app(RequireScope::new(["read", "write"]));
        let identity = Identity::new(json!({}), ["write", "read"]);

        let response = app.oneshot(request("/", None, Some(identity))?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn require_scope_without_identity() -> Result<()> {
        let app = scoped_app(RequireScope::new(Vec::<String>::new()));

        let response = app.oneshot(request("/", Some("t"), None)?).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await?, json!({ "reason": "no_scopes" }));
        Ok(())
    }

    #[tokio::test]
    async fn membership_requires_credential() -> Result<()> {
        let provider = Arc::new(StubProvider::default());
        let app = group_app(RequireMembership::new(provider.clone(), "owner"));

        let response = app.oneshot(request("/groups/g1", None, None)?).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await?, json!({ "reason": "no_token" }));
        assert!(provider.lookups().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn membership_allows_matching_role() -> Result<()> {
        let provider = Arc::new(StubProvider {
            access: GroupAccess {
                group_role: Some("owner".to_string()),
                group_uid: Some("g1".to_string()),
                ..GroupAccess::default()
            },
            ..StubProvider::default()
        });
        let app = group_app(RequireMembership::new(provider.clone(), ["owner", "instructor"]));

        let response = app.oneshot(request("/groups/g1", Some("tok"), None)?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(provider.lookups(), vec!["access g1 tok"]);
        Ok(())
    }

    #[tokio::test]
    async fn membership_rejects_plain_member() -> Result<()> {
        let provider = Arc::new(StubProvider {
            access: GroupAccess {
                group_role: Some("member".to_string()),
                ..GroupAccess::default()
            },
            ..StubProvider::default()
        });
        let app = group_app(RequireMembership::new(provider, "owner"));

        let response = app.oneshot(request("/groups/g1", Some("tok"), None)?).await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await?,
            json!({ "reason": "not_member_of_group" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn membership_school_admin_override() -> Result<()> {
        let access = GroupAccess {
            group_role: None,
            school_admin_role: Some("owner".to_string()),
            ..GroupAccess::default()
        };

        let allowed = Arc::new(StubProvider {
            access: access.clone(),
            ..StubProvider::default()
        });
        let response = group_app(RequireMembership::new(allowed, "instructor"))
            .oneshot(request("/groups/g1", Some("tok"), None)?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let disabled = Arc::new(StubProvider {
            access,
            ..StubProvider::default()
        });
        let gate = RequireMembership::new(disabled, "instructor")
            .with_options(MembershipOptions::new().with_allow_school_admins(false));
        let response = group_app(gate)
            .oneshot(request("/groups/g1", Some("tok"), None)?)
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn membership_translates_upstream_status() -> Result<()> {
        let provider = Arc::new(StubProvider {
            failure: Some(StatusCode::NOT_FOUND),
            ..StubProvider::default()
        });
        let app = group_app(RequireMembership::new(provider, "owner"));

        let response = app.oneshot(request("/groups/g1", Some("tok"), None)?).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await?,
            json!({ "reason": "group_not_found" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn membership_without_group_param_is_configuration_error() -> Result<()> {
        let provider = Arc::new(StubProvider::default());
        let app = RequireMembership::new(provider.clone(), "owner")
            .apply(Router::new().route("/groups", get(|| async { "ok" })));

        let response = app.oneshot(request("/groups", Some("tok"), None)?).await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(provider.lookups().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn connection_requires_group_role() -> Result<()> {
        let provider = Arc::new(StubProvider {
            connections: Connections {
                groups: vec![connection("student")],
                school_admin_schools: vec![connection("owner")],
            },
            ..StubProvider::default()
        });
        let gate = RequireUserConnection::new(
            provider.clone(),
            ConnectionOptions::new().with_role("collaborator"),
        );

        let response = user_app(gate)
            .oneshot(request("/users/u2", Some("tok"), None)?)
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await?,
            json!({
                "reason": "invalid_connection",
                "type": "group",
                "required": ["collaborator"]
            })
        );
        assert_eq!(provider.lookups(), vec!["connections u2 tok"]);
        Ok(())
    }

    #[tokio::test]
    async fn connection_default_requires_school_admin() -> Result<()> {
        let provider = Arc::new(StubProvider {
            connections: Connections {
                groups: vec![connection("collaborator")],
                school_admin_schools: vec![connection("viewer")],
            },
            ..StubProvider::default()
        });
        let gate = RequireUserConnection::new(provider, ConnectionOptions::new());

        let response = user_app(gate)
            .oneshot(request("/users/u2", Some("tok"), None)?)
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await?,
            json!({
                "reason": "invalid_connection",
                "type": "school_admin",
                "required": ["owner", "collaborator"]
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn connection_passes_when_both_match() -> Result<()> {
        let provider = Arc::new(StubProvider {
            connections: Connections {
                groups: vec![connection("student"), connection("collaborator")],
                school_admin_schools: vec![connection("owner")],
            },
            ..StubProvider::default()
        });
        let gate = RequireUserConnection::new(
            provider,
            ConnectionOptions::new().with_role(["collaborator", "owner"]),
        );

        let response = user_app(gate)
            .oneshot(request("/users/u2", Some("tok"), None)?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn connection_without_school_admin_requirement() -> Result<()> {
        let provider = Arc::new(StubProvider::default());
        let gate = RequireUserConnection::new(
            provider,
            ConnectionOptions::new().without_school_admin_role(),
        );

        let response = user_app(gate)
            .oneshot(request("/users/u2", Some("tok"), None)?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn connection_reads_custom_param_key() -> Result<()> {
        let provider = Arc::new(StubProvider::default());
        let gate = RequireUserConnection::new(
            provider.clone(),
            ConnectionOptions::new()
                .without_school_admin_role()
                .with_param_key("student_uid"),
        );
        let app = gate.apply(Router::new().route("/students/:student_uid", get(|| async { "ok" })));

        let response = app
            .oneshot(request("/students/s9", Some("tok"), None)?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(provider.lookups(), vec!["connections s9 tok"]);
        Ok(())
    }
}
