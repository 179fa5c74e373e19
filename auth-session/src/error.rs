use std::time::Duration;
use thiserror::Error;

/// Signing-side failures. These indicate misconfiguration and are fatal
/// at startup; they are never shown to clients.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{0} signing secret is not configured")]
    MissingSecret(&'static str),

    #[error("{0} signing secret is shorter than 32 bytes")]
    WeakSecret(&'static str),

    #[error("access and refresh tokens must use different secrets")]
    SharedSecret,

    #[error("token lifetimes must be greater than zero")]
    InvalidLifetime,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Why a presented token was not accepted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store call exceeded {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<auth_identity::IdentityError> for StoreError {
    fn from(err: auth_identity::IdentityError) -> Self {
        match err {
            auth_identity::IdentityError::DatabaseError(e) => Self::Database(e),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures of engine operations outside the refresh state machine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
