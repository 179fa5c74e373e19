use auth_identity::{Identity, Role};
use serde::Serialize;
use uuid::Uuid;

/// How the current request was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    AccessToken,
    Refresh,
    DevBypass,
}

/// Authentication context injected into request extensions
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub user: Identity,
    pub method: AuthMethod,

    /// Set when the gate refreshed the session for this request
    pub session_id: Option<Uuid>,

    /// Access token minted during this request, if any. Also returned to
    /// the client in the `x-access-token` response header.
    #[serde(skip)]
    pub issued_access_token: Option<String>,
}

impl AuthContext {
    pub fn from_access_token(user: Identity) -> Self {
        Self {
            user,
            method: AuthMethod::AccessToken,
            session_id: None,
            issued_access_token: None,
        }
    }

    pub fn dev_bypass(user: Identity) -> Self {
        Self {
            user,
            method: AuthMethod::DevBypass,
            session_id: None,
            issued_access_token: None,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }
}
