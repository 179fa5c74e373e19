//! Identity model and user-directory interface for the session core
//!
//! The session core never owns user records. It reads identities by
//! identifier through the [`UserDirectory`] trait and, for local development
//! only, provisions a standing development identity through the same trait.
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_identity::{InMemoryUserDirectory, NewIdentity, Role, UserDirectory};
//!
//! # async fn demo() -> auth_identity::Result<()> {
//! let directory = InMemoryUserDirectory::new();
//! let user = directory
//!     .create_user(NewIdentity::new("user@example.com").with_role(Role::User))
//!     .await?;
//!
//! let found = directory.get_user_by_id(user.id).await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dev;
pub mod error;
pub mod models;
pub mod repository;

pub use config::DevIdentityConfig;
pub use dev::ensure_dev_identity;
pub use error::{IdentityError, Result};
pub use models::*;
pub use repository::{InMemoryUserDirectory, PgUserDirectory, UserDirectory};
