use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted refresh session. The raw refresh credential is never stored,
/// only its hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub expiration: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// A freshly signed token and the claims it carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedToken {
    pub token: String,
    pub subject: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Claims recovered from a token whose signature checked out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerifiedToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Raw refresh credential handed to the client, with the expiry its
/// cookie should carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCredential {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl From<SignedToken> for RefreshCredential {
    fn from(token: SignedToken) -> Self {
        Self {
            value: token.token,
            expires_at: token.expires_at,
        }
    }
}
