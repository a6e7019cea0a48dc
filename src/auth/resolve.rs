//! Token resolution middleware.
//!
//! An [`Authenticator`] pulls a credential off the request, resolves it via the
//! configured [`IdentityProvider`] and stores both the [`Credential`] and the
//! resulting [`Identity`] in the request extensions.

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::{
    credential::{extract_bearer_token, Credential, Session},
    error::AuthError,
    options::AuthOptions,
};
use crate::client::{Identity, IdentityProvider, UpstreamError};

/// Where a credential may be read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    /// The configured property of the request's [`Session`].
    Session,
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// Bearer header first, session property otherwise.
    BearerOrSession,
}

#[derive(Clone)]
pub struct Authenticator {
    provider: Arc<dyn IdentityProvider>,
    source: CredentialSource,
    options: Arc<AuthOptions>,
}

impl Authenticator {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        source: CredentialSource,
        options: AuthOptions,
    ) -> Self {
        Self {
            provider,
            source,
            options: Arc::new(options),
        }
    }

    #[must_use]
    pub fn with_session(provider: Arc<dyn IdentityProvider>, options: AuthOptions) -> Self {
        Self::new(provider, CredentialSource::Session, options)
    }

    #[must_use]
    pub fn with_bearer(provider: Arc<dyn IdentityProvider>, options: AuthOptions) -> Self {
        Self::new(provider, CredentialSource::Bearer, options)
    }

    #[must_use]
    pub fn with_bearer_or_session(
        provider: Arc<dyn IdentityProvider>,
        options: AuthOptions,
    ) -> Self {
        Self::new(provider, CredentialSource::BearerOrSession, options)
    }

    #[must_use]
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    #[must_use]
    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    /// Wrap every route of `router`.
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self, authenticate))
    }

    /// The credential for this request and whether it came from a bearer header.
    fn credential(&self, request: &Request) -> Result<(Credential, bool), AuthError> {
        let bearer = match self.source {
            CredentialSource::Session => None,
            CredentialSource::Bearer | CredentialSource::BearerOrSession => {
                extract_bearer_token(request.headers())
            }
        };

        if let Some(credential) = bearer {
            return Ok((credential, true));
        }

        if self.source == CredentialSource::Bearer {
            return Err(AuthError::unauthorized("invalid_authorization_header"));
        }

        request
            .extensions()
            .get::<Session>()
            .and_then(|session| session.token(self.options.session_key()))
            .map(|credential| (credential, false))
            .ok_or_else(|| AuthError::unauthorized("no_session"))
    }
}

/// Resolve the caller, then forward the request or reject it.
///
/// # Errors
/// Rejects with `401` when no credential is present. A failed lookup is
/// forwarded, redirected or relayed depending on the [`AuthOptions`].
#[instrument(skip_all, name = "makerpass.authenticate")]
pub async fn authenticate(
    State(auth): State<Authenticator>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if auth.options.preset_identity() {
        if request.extensions().get::<Identity>().is_none() {
            return Err(AuthError::Configuration(
                "preset identity enabled but the request carries no Identity",
            ));
        }
        return Ok(next.run(request).await);
    }

    let (credential, bearer_present) = auth.credential(&request).inspect_err(|_| {
        debug!("No credential found ({:?})", auth.source);
    })?;

    request.extensions_mut().insert(credential.clone());

    match auth.provider.resolve_identity(credential.expose()).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(err) => {
            warn!("Identity lookup failed: {}", err);

            let policy = auth.options.failure_policy(bearer_present);
            if !policy.required {
                return Ok(next.run(request).await);
            }
            if matches!(err, UpstreamError::Decode { .. }) {
                return Err(AuthError::Fatal(err));
            }
            if let Some(url) = policy.redirect_on_failure {
                return Err(AuthError::Redirect(url.to_string()));
            }
            Err(AuthError::upstream_verbatim(err))
        }
    }
}
