/// Authentication gate for Axum
///
/// Verifies the access token on every request and, when it is missing or
/// expired, runs the refresh protocol against the refresh cookie. The
/// outcome becomes an `AuthContext` in request extensions or a rejection.

use crate::config::{GateConfig, GateConfigError};
use crate::context::{AuthContext, AuthMethod};
use crate::cookie::{clear_refresh_cookie, refresh_cookie, sets_cookie};
use crate::error::GateRejection;
use crate::extract;
use auth_identity::Identity;
use auth_session::{
    store::bounded, RefreshEngine, RefreshOutcome, RefreshRequest, RefreshedSession,
    VerificationError,
};
use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderName, HeaderValue, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Response header carrying an access token minted by the gate
pub const ACCESS_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-access-token");

/// Shared gate state
#[derive(Clone)]
pub struct AuthGate {
    engine: Arc<RefreshEngine>,
    config: Arc<GateConfig>,
    dev_identity: Option<Identity>,
}

/// Where a request stands after credential checks
pub(crate) enum Resolution {
    Authenticated(AuthContext, Option<Box<RefreshedSession>>),
    Anonymous,
    Rejected(GateRejection),
}

impl AuthGate {
    /// # Errors
    ///
    /// Invalid gate configuration, including a development bypass outside
    /// development or without a provisioned identity.
    pub fn new(
        engine: Arc<RefreshEngine>,
        config: GateConfig,
        dev_identity: Option<Identity>,
    ) -> Result<Self, GateConfigError> {
        config.validate()?;

        let dev_identity = if config.dev_auto_login {
            let identity = dev_identity.ok_or(GateConfigError::DevIdentityMissing)?;
            tracing::warn!(
                user_id = %identity.id,
                "Development auto-login enabled; all requests authenticate as the development identity"
            );
            Some(identity)
        } else {
            None
        };

        Ok(Self {
            engine,
            config: Arc::new(config),
            dev_identity,
        })
    }

    pub fn engine(&self) -> &RefreshEngine {
        &self.engine
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn dev_identity(&self) -> Option<&Identity> {
        self.dev_identity.as_ref()
    }

    pub(crate) async fn resolve(&self, headers: &HeaderMap, uri: &Uri) -> Resolution {
        if let Some(identity) = &self.dev_identity {
            return Resolution::Authenticated(AuthContext::dev_bypass(identity.clone()), None);
        }

        if let Some(token) = extract::access_token(headers, &self.config.cookies) {
            match self.engine.verify_access(&token) {
                Ok(verified) => return self.load_identity(verified.subject).await,
                // Expired access tokens fall through to the refresh protocol
                Err(VerificationError::Expired) => {}
                Err(e) => {
                    tracing::warn!(reason = %e, "Rejected access token");
                    return Resolution::Rejected(GateRejection::InvalidAccessToken);
                }
            }
        }

        let request = RefreshRequest::new(extract::refresh_credential(headers, &self.config.cookies))
            .with_retry(extract::retry_requested(headers, uri));

        self.settle(self.engine.refresh(request).await)
    }

    async fn load_identity(&self, user_id: uuid::Uuid) -> Resolution {
        let lookup = bounded(
            self.engine.store_timeout(),
            self.engine.directory().get_user_by_id(user_id),
        )
        .await;

        match lookup {
            Ok(Some(user)) => Resolution::Authenticated(AuthContext::from_access_token(user), None),
            Ok(None) => {
                tracing::warn!(user_id = %user_id, "Access token names an unknown user");
                Resolution::Rejected(GateRejection::InvalidAccessToken)
            }
            Err(e) => {
                logger_redacted::redacted_error!("User directory unavailable: {}", e);
                Resolution::Rejected(GateRejection::StoreUnavailable)
            }
        }
    }

    /// Map a refresh result onto the gate's response taxonomy
    pub(crate) fn settle(
        &self,
        result: Result<RefreshOutcome, auth_session::EngineError>,
    ) -> Resolution {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Refresh failed on the signing side");
                return Resolution::Rejected(GateRejection::Internal);
            }
        };

        match outcome {
            RefreshOutcome::Refreshed(refreshed) => {
                let context = AuthContext {
                    user: refreshed.identity.clone(),
                    method: AuthMethod::Refresh,
                    session_id: Some(refreshed.session.id),
                    issued_access_token: Some(refreshed.access_token.token.clone()),
                };
                Resolution::Authenticated(context, Some(refreshed))
            }
            RefreshOutcome::NoCredential => Resolution::Anonymous,
            RefreshOutcome::Invalid => Resolution::Rejected(GateRejection::InvalidRefreshToken {
                clear_cookie: self.clear_cookie(),
            }),
            RefreshOutcome::SessionMissing => Resolution::Rejected(GateRejection::SessionMissing),
            RefreshOutcome::CredentialExpired => {
                Resolution::Rejected(GateRejection::CredentialExpired {
                    login_path: self.config.cookies.login_path.clone(),
                    clear_cookie: self.clear_cookie(),
                })
            }
            RefreshOutcome::NoSessionFound => Resolution::Rejected(GateRejection::NoSessionFound {
                clear_cookie: self.clear_cookie(),
            }),
            RefreshOutcome::StoreUnavailable => Resolution::Rejected(GateRejection::StoreUnavailable),
        }
    }

    pub(crate) fn clear_cookie(&self) -> Option<HeaderValue> {
        clear_refresh_cookie(&self.config)
            .map_err(|e| tracing::error!(error = %e, "Cannot build refresh cookie"))
            .ok()
    }

    /// Add the refreshed access token header and refresh cookie
    pub(crate) fn attach_refreshed(&self, headers: &mut HeaderMap, refreshed: &RefreshedSession) {
        match HeaderValue::from_str(&refreshed.access_token.token) {
            Ok(value) => {
                headers.insert(ACCESS_TOKEN_HEADER, value);
            }
            Err(e) => tracing::error!(error = %e, "Cannot encode access token header"),
        }

        match refresh_cookie(&self.config, &refreshed.refresh_credential) {
            Ok(cookie) => {
                headers.append(SET_COOKIE, cookie);
            }
            Err(e) => tracing::error!(error = %e, "Cannot build refresh cookie"),
        }
    }

    /// Attach a gate-side refresh to the handler's response, unless the
    /// handler already set or cleared the refresh cookie itself
    fn finish(&self, mut response: Response, refreshed: Option<Box<RefreshedSession>>) -> Response {
        let Some(refreshed) = refreshed else {
            return response;
        };

        if sets_cookie(response.headers(), &self.config.cookies.refresh_cookie_name) {
            tracing::debug!(
                session_id = %refreshed.session.id,
                "Handler owns the refresh cookie; dropping gate refresh"
            );
        } else {
            self.attach_refreshed(response.headers_mut(), &refreshed);
        }
        response
    }
}

/// Require an authenticated identity
///
/// Rejects with 401 when no credential is present at all.
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    match gate.resolve(request.headers(), request.uri()).await {
        Resolution::Authenticated(context, refreshed) => {
            tracing::debug!(
                user_id = %context.user.id,
                method = ?context.method,
                "Request authenticated"
            );
            request.extensions_mut().insert(context);

            let response = next.run(request).await;
            Ok(gate.finish(response, refreshed))
        }
        Resolution::Anonymous => Err(GateRejection::Unauthenticated),
        Resolution::Rejected(rejection) => Err(rejection),
    }
}

/// Authenticate when possible, otherwise continue anonymously
///
/// Rejected credentials do not fail the request; handlers see no
/// `AuthContext`. Store outages and internal failures still fail it.
pub async fn optional_auth(State(gate): State<AuthGate>, mut request: Request, next: Next) -> Response {
    match gate.resolve(request.headers(), request.uri()).await {
        Resolution::Authenticated(context, refreshed) => {
            request.extensions_mut().insert(context);

            let response = next.run(request).await;
            gate.finish(response, refreshed)
        }
        Resolution::Anonymous => next.run(request).await,
        Resolution::Rejected(rejection) if rejection.is_server_failure() => rejection.into_response(),
        Resolution::Rejected(rejection) => {
            tracing::debug!(reason = %rejection, "Continuing anonymously");
            next.run(request).await
        }
    }
}
