//! Reference gateway: MakerPass resources served behind the auth middleware.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

use crate::{
    auth::{
        AuthOptions, Authenticator, ConnectionOptions, RequireMembership, RequireScope,
        RequireUserConnection,
    },
    client::{ApiClient, IdentityProvider},
};

pub mod handlers;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub api_host: String,
    pub redirect_on_failure: Option<String>,
    pub optional_auth: bool,
    pub required_scopes: Vec<String>,
    pub group_roles: Vec<String>,
}

impl GatewayConfig {
    fn auth_options(&self) -> Result<AuthOptions> {
        let options = AuthOptions::new().with_required(!self.optional_auth);
        Ok(match &self.redirect_on_failure {
            Some(url) => options
                .with_redirect_on_failure(url.clone())
                .with_context(|| format!("invalid redirect URL: {url:?}"))?,
            None => options,
        })
    }
}

/// Routes and middleware for the gateway, without binding a socket.
/// # Errors
/// Returns an error if the redirect URL is not a valid header value.
pub fn router(client: ApiClient, config: &GatewayConfig) -> Result<Router> {
    let provider: Arc<dyn IdentityProvider> = Arc::new(client.clone());

    let me = Router::new()
        .route("/me", get(handlers::me))
        .route("/me/groups", get(handlers::me_groups))
        .route("/me/schools", get(handlers::me_schools));

    let groups = RequireMembership::new(provider.clone(), config.group_roles.clone()).apply(
        Router::new()
            .route("/groups/:group_uid", get(handlers::group))
            .route("/groups/:group_uid/memberships", get(handlers::group_memberships)),
    );

    let users = RequireUserConnection::new(provider.clone(), ConnectionOptions::new()).apply(
        Router::new()
            .route("/users/:user_uid", get(handlers::user))
            .route("/users/:user_uid/groups", get(handlers::user_groups)),
    );

    let protected = me.merge(groups).merge(users);
    let protected = if config.required_scopes.is_empty() {
        protected
    } else {
        RequireScope::new(config.required_scopes.clone()).apply(protected)
    };

    let app = Authenticator::with_bearer_or_session(provider, config.auth_options()?)
        .apply(protected)
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(client)),
        );

    Ok(app)
}

/// Start the gateway on `port`.
/// # Errors
/// Returns an error if the API host is invalid or the listener cannot be bound.
pub async fn new(port: u16, config: GatewayConfig) -> Result<()> {
    let client = ApiClient::new(&config.api_host)?;

    let app = router(client, &config)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{} (upstream {})", port, config.api_host);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
