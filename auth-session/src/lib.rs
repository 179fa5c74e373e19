//! Session and refresh-token lifecycle
//!
//! - [`codec`]: mints and verifies access tokens and refresh credentials
//! - [`store`]: persisted sessions keyed by refresh credential hash
//! - [`engine`]: the refresh protocol that ties the two together
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use auth_identity::InMemoryUserDirectory;
//! use auth_session::{
//!     InMemorySessionStore, RefreshEngine, RefreshOutcome, RefreshRequest, SessionConfig,
//!     TokenConfig,
//! };
//!
//! # async fn demo(user_id: uuid::Uuid) -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = TokenConfig::with_secrets(
//!     std::env::var("JWT_SECRET")?,
//!     std::env::var("JWT_REFRESH_SECRET")?,
//! );
//! let engine = RefreshEngine::new(
//!     &tokens,
//!     &SessionConfig::default(),
//!     Arc::new(InMemorySessionStore::new()),
//!     Arc::new(InMemoryUserDirectory::new()),
//! )?;
//!
//! let issued = engine.establish(user_id).await?;
//! let request = RefreshRequest::new(Some(issued.refresh_credential.value));
//! if let RefreshOutcome::Refreshed(refreshed) = engine.refresh(request).await? {
//!     println!("new access token expires at {}", refreshed.access_token.expires_at);
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;

pub use codec::{hash_credential, TokenClaims, TokenCodec, TokenKind};
pub use config::{SessionConfig, StoreBackend, TokenConfig, MIN_SECRET_LEN};
pub use engine::{IssuedTokens, RefreshEngine, RefreshOutcome, RefreshRequest, RefreshedSession};
pub use error::{CodecError, EngineError, StoreError, StoreResult, VerificationError};
pub use models::{RefreshCredential, Session, SignedToken, VerifiedToken};
pub use store::{InMemorySessionStore, PgSessionStore, SessionStore};
