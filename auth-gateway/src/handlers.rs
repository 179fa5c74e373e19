use crate::context::AuthContext;
use crate::cookie::refresh_cookie;
use crate::error::GateRejection;
use crate::extract;
use crate::middleware::{AuthGate, Resolution};
use auth_identity::Identity;
use auth_session::{EngineError, RefreshOutcome, RefreshRequest, RefreshedSession};
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: Identity,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub message: &'static str,
    pub sessions_revoked: u64,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Identity,
}

/// POST /api/auth/refresh
///
/// Exchanges the refresh cookie for a new access token. In development
/// auto-login mode the development identity gets a session instead.
pub async fn refresh(
    State(gate): State<AuthGate>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, GateRejection> {
    if let Some(identity) = gate.dev_identity() {
        return dev_refresh(&gate, identity, &headers).await;
    }

    let request = RefreshRequest::new(extract::refresh_credential(&headers, &gate.config().cookies))
        .with_retry(extract::retry_requested(&headers, &uri));

    match gate.settle(gate.engine().refresh(request).await) {
        Resolution::Authenticated(_, Some(refreshed)) => Ok(refreshed_response(&gate, *refreshed)),
        Resolution::Anonymous => Ok(Json(MessageResponse {
            message: "Refresh token not provided",
        })
        .into_response()),
        Resolution::Rejected(rejection) => Err(rejection),
        Resolution::Authenticated(_, None) => Err(GateRejection::Internal),
    }
}

/// Rotate the presented development session in place, or replace every
/// earlier session of the development identity with a fresh one
async fn dev_refresh(
    gate: &AuthGate,
    identity: &Identity,
    headers: &HeaderMap,
) -> Result<Response, GateRejection> {
    let engine = gate.engine();

    if let Some(credential) = extract::refresh_credential(headers, &gate.config().cookies) {
        if let Ok(RefreshOutcome::Refreshed(refreshed)) =
            engine.refresh(RefreshRequest::new(Some(credential))).await
        {
            if refreshed.identity.id == identity.id {
                return Ok(refreshed_response(gate, *refreshed));
            }
        }
    }

    let dev_session_failed = |e: EngineError| {
        logger_redacted::redacted_error!("Cannot issue development session: {}", e);
        GateRejection::StoreUnavailable
    };

    engine.invalidate_all(identity.id).await.map_err(dev_session_failed)?;
    let issued = engine.establish(identity.id).await.map_err(dev_session_failed)?;

    let mut response = Json(TokenResponse {
        token: issued.access_token.token,
        user: identity.clone(),
    })
    .into_response();
    if let Ok(cookie) = refresh_cookie(gate.config(), &issued.refresh_credential) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    Ok(response)
}

fn refreshed_response(gate: &AuthGate, refreshed: RefreshedSession) -> Response {
    let mut response = (
        StatusCode::OK,
        Json(TokenResponse {
            token: refreshed.access_token.token.clone(),
            user: refreshed.identity.clone(),
        }),
    )
        .into_response();
    gate.attach_refreshed(response.headers_mut(), &refreshed);
    response
}

/// POST /api/auth/logout
///
/// Ends the session behind the refresh cookie, if any, and clears the
/// cookie either way.
pub async fn logout(State(gate): State<AuthGate>, headers: HeaderMap) -> Result<Response, GateRejection> {
    if let Some(credential) = extract::refresh_credential(&headers, &gate.config().cookies) {
        gate.engine().revoke(&credential).await.map_err(|e| {
            logger_redacted::redacted_error!("Logout failed: {}", e);
            GateRejection::StoreUnavailable
        })?;
    }

    Ok(with_cleared_cookie(&gate, MessageResponse { message: "Logged out" }))
}

/// POST /api/auth/logout-all
///
/// Ends every session of the authenticated user.
pub async fn logout_all(
    State(gate): State<AuthGate>,
    Extension(context): Extension<AuthContext>,
) -> Result<Response, GateRejection> {
    let sessions_revoked = gate
        .engine()
        .invalidate_all(context.user_id())
        .await
        .map_err(|e| {
            logger_redacted::redacted_error!("Logout-all failed: {}", e);
            GateRejection::StoreUnavailable
        })?;

    Ok(with_cleared_cookie(
        &gate,
        LogoutAllResponse {
            message: "Logged out of all sessions",
            sessions_revoked,
        },
    ))
}

/// GET /api/auth/me
pub async fn me(Extension(context): Extension<AuthContext>) -> Json<MeResponse> {
    Json(MeResponse { user: context.user })
}

fn with_cleared_cookie<T: Serialize>(gate: &AuthGate, body: T) -> Response {
    let mut response = Json(body).into_response();
    if let Some(cookie) = gate.clear_cookie() {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}
