use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("User directory unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, IdentityError>;
