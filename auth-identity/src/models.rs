use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse role carried on an identity. Authorization beyond session
/// validity is handled elsewhere; the role is only passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    /// Unknown stored values degrade to `User`
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        }
    }
}

/// A user as seen by the session core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a user in the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIdentity {
    pub email: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub email_verified: bool,
}

impl NewIdentity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: None,
            display_name: None,
            role: Role::default(),
            email_verified: false,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn verified(mut self) -> Self {
        self.email_verified = true;
        self
    }

    /// Materialize into an identity with a fresh identifier
    pub fn into_identity(self) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: self.email,
            username: self.username,
            display_name: self.display_name,
            role: self.role,
            email_verified: self.email_verified,
            created_at: Utc::now(),
        }
    }
}
