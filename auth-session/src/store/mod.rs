/// Session store adapter
///
/// Persists refresh sessions keyed by user and refresh credential hash.
/// Every mutation is a single atomic operation against the backing store;
/// expiry is enforced at read time rather than left to storage-level TTLs.

pub mod memory;
pub mod postgres;

pub use memory::InMemorySessionStore;
pub use postgres::PgSessionStore;

use crate::error::{StoreError, StoreResult};
use crate::models::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session
    async fn create(
        &self,
        user_id: Uuid,
        refresh_token_hash: &str,
        expiration: DateTime<Utc>,
    ) -> StoreResult<Session>;

    /// Session for this user and hash, only if it has not expired
    async fn find_valid(&self, user_id: Uuid, refresh_token_hash: &str) -> StoreResult<Option<Session>>;

    /// Swap the session's hash and expiration, keeping its id.
    ///
    /// Applies only if the stored record still carries `prior`'s hash and
    /// is unexpired; `None` means another request rotated it first.
    async fn rotate(
        &self,
        prior: &Session,
        new_refresh_token_hash: &str,
        new_expiration: DateTime<Utc>,
    ) -> StoreResult<Option<Session>>;

    /// Remove the single session matching this credential hash
    async fn delete(&self, user_id: Uuid, refresh_token_hash: &str) -> StoreResult<bool>;

    /// Remove every session of a user. Idempotent.
    async fn invalidate_all(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Remove expired sessions still present in storage
    async fn purge_expired(&self) -> StoreResult<u64>;
}

/// Run a store (or directory) call under a deadline
///
/// # Errors
///
/// The call's own error, or `StoreError::Timeout` when the deadline passes.
pub async fn bounded<T, E, F>(timeout: Duration, call: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<StoreError>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let value = bounded(Duration::from_secs(1), async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }
}
