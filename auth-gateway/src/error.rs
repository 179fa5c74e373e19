use axum::{
    http::{
        header::{LOCATION, RETRY_AFTER, SET_COOKIE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Why the gate (or an auth endpoint) turned a request away
#[derive(Debug, Error)]
pub enum GateRejection {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid authentication token")]
    InvalidAccessToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken { clear_cookie: Option<HeaderValue> },

    #[error("Refresh token expired or not found for this user")]
    SessionMissing,

    #[error("Refresh token expired, please log in again")]
    CredentialExpired {
        login_path: String,
        clear_cookie: Option<HeaderValue>,
    },

    #[error("No session found")]
    NoSessionFound { clear_cookie: Option<HeaderValue> },

    #[error("Session store unavailable")]
    StoreUnavailable,

    #[error("Internal authentication error")]
    Internal,
}

impl GateRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidAccessToken | Self::SessionMissing => {
                StatusCode::UNAUTHORIZED
            }
            Self::InvalidRefreshToken { .. }
            | Self::CredentialExpired { .. }
            | Self::NoSessionFound { .. } => StatusCode::FORBIDDEN,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The server failed, not the client's credentials
    pub fn is_server_failure(&self) -> bool {
        matches!(self, Self::StoreUnavailable | Self::Internal)
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        let mut response = (status, Json(body)).into_response();
        let headers = response.headers_mut();

        match self {
            Self::InvalidRefreshToken { clear_cookie } | Self::NoSessionFound { clear_cookie } => {
                if let Some(cookie) = clear_cookie {
                    headers.append(SET_COOKIE, cookie);
                }
            }
            Self::CredentialExpired { login_path, clear_cookie } => {
                if let Ok(location) = HeaderValue::from_str(&login_path) {
                    headers.insert(LOCATION, location);
                }
                if let Some(cookie) = clear_cookie {
                    headers.append(SET_COOKIE, cookie);
                }
            }
            Self::StoreUnavailable => {
                headers.insert(RETRY_AFTER, HeaderValue::from_static("1"));
            }
            Self::Unauthenticated | Self::InvalidAccessToken | Self::SessionMissing | Self::Internal => {}
        }

        response
    }
}
