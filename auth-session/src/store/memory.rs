use super::SessionStore;
use crate::error::StoreResult;
use crate::models::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory session store for development and tests.
///
/// Rotation takes the shard write lock of the session entry, which makes
/// the compare-and-swap on the prior hash atomic.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<Uuid, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session as-is (test fixtures use this for already expired records)
    pub fn insert(&self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    pub fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of records held, expired ones included
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn remove_matching(&self, predicate: impl Fn(&Session) -> bool) -> u64 {
        let ids: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for id in ids {
            if self.sessions.remove_if(&id, |_, session| predicate(session)).is_some() {
                removed += 1;
            }
        }
        removed
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(
        &self,
        user_id: Uuid,
        refresh_token_hash: &str,
        expiration: DateTime<Utc>,
    ) -> StoreResult<Session> {
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            refresh_token_hash: refresh_token_hash.to_string(),
            expiration,
            created_at: Utc::now(),
        };
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_valid(&self, user_id: Uuid, refresh_token_hash: &str) -> StoreResult<Option<Session>> {
        let now = Utc::now();
        Ok(self
            .sessions
            .iter()
            .find(|entry| {
                entry.user_id == user_id
                    && entry.refresh_token_hash == refresh_token_hash
                    && !entry.is_expired_at(now)
            })
            .map(|entry| entry.value().clone()))
    }

    async fn rotate(
        &self,
        prior: &Session,
        new_refresh_token_hash: &str,
        new_expiration: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        let now = Utc::now();
        let Some(mut entry) = self.sessions.get_mut(&prior.id) else {
            return Ok(None);
        };

        if entry.user_id != prior.user_id
            || entry.refresh_token_hash != prior.refresh_token_hash
            || entry.is_expired_at(now)
        {
            return Ok(None);
        }

        entry.refresh_token_hash = new_refresh_token_hash.to_string();
        entry.expiration = new_expiration;
        Ok(Some(entry.value().clone()))
    }

    async fn delete(&self, user_id: Uuid, refresh_token_hash: &str) -> StoreResult<bool> {
        let removed = self.remove_matching(|session| {
            session.user_id == user_id && session.refresh_token_hash == refresh_token_hash
        });
        Ok(removed > 0)
    }

    async fn invalidate_all(&self, user_id: Uuid) -> StoreResult<u64> {
        Ok(self.remove_matching(|session| session.user_id == user_id))
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let now = Utc::now();
        Ok(self.remove_matching(|session| session.is_expired_at(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn expired_session(user_id: Uuid, hash: &str) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id,
            refresh_token_hash: hash.to_string(),
            expiration: Utc::now() - Duration::minutes(1),
            created_at: Utc::now() - Duration::days(8),
        }
    }

    #[tokio::test]
    async fn test_create_then_find_valid() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let expiration = Utc::now() + Duration::days(7);

        let created = store.create(user_id, "hash-1", expiration).await.unwrap();
        let found = store.find_valid(user_id, "hash-1").await.unwrap().unwrap();

        assert_eq!(found, created);
        assert_eq!(found.user_id, user_id);
        assert_eq!(found.refresh_token_hash, "hash-1");
        assert_eq!(found.expiration, expiration);
    }

    #[tokio::test]
    async fn test_expired_session_not_returned_without_deletion() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        store.insert(expired_session(user_id, "stale"));

        assert!(store.find_valid(user_id, "stale").await.unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_find_valid_requires_matching_user() {
        let store = InMemorySessionStore::new();
        store
            .create(Uuid::new_v4(), "shared", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert!(store.find_valid(Uuid::new_v4(), "shared").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rotate_keeps_id_and_rejects_stale_hash() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let session = store
            .create(user_id, "old", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        let new_expiration = Utc::now() + Duration::days(7);
        let rotated = store.rotate(&session, "new", new_expiration).await.unwrap().unwrap();
        assert_eq!(rotated.id, session.id);
        assert_eq!(rotated.refresh_token_hash, "new");
        assert_eq!(rotated.expiration, new_expiration);
        assert_eq!(store.len(), 1);

        // Second rotation from the same stale snapshot loses
        assert!(store.rotate(&session, "newer", new_expiration).await.unwrap().is_none());
        assert!(store.find_valid(user_id, "old").await.unwrap().is_none());
        assert!(store.find_valid(user_id, "new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rotate_refuses_expired_session() {
        let store = InMemorySessionStore::new();
        let session = expired_session(Uuid::new_v4(), "stale");
        store.insert(session.clone());

        let result = store
            .rotate(&session, "fresh", Utc::now() + Duration::days(1))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_single_session() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let expiration = Utc::now() + Duration::hours(1);
        store.create(user_id, "a", expiration).await.unwrap();
        store.create(user_id, "b", expiration).await.unwrap();

        assert!(store.delete(user_id, "a").await.unwrap());
        assert!(!store.delete(user_id, "a").await.unwrap());
        assert!(store.find_valid(user_id, "b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_all_is_idempotent() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();
        let expiration = Utc::now() + Duration::hours(1);

        store.create(user_id, "a", expiration).await.unwrap();
        store.create(user_id, "b", expiration).await.unwrap();
        store.create(other_user, "c", expiration).await.unwrap();

        assert_eq!(store.invalidate_all(user_id).await.unwrap(), 2);
        assert_eq!(store.invalidate_all(user_id).await.unwrap(), 0);

        assert!(store.find_valid(user_id, "a").await.unwrap().is_none());
        assert!(store.find_valid(user_id, "b").await.unwrap().is_none());
        assert!(store.find_valid(other_user, "c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        store.insert(expired_session(user_id, "old"));
        store.create(user_id, "live", Utc::now() + Duration::hours(1)).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_create_then_find_valid(
            user in any::<u128>(),
            hash in "[A-Za-z0-9+/]{8,44}",
            minutes in 1i64..100_000,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async {
                let store = InMemorySessionStore::new();
                let user_id = Uuid::from_u128(user);
                let expiration = Utc::now() + Duration::minutes(minutes);

                let created = store.create(user_id, &hash, expiration).await.unwrap();
                let found = store.find_valid(user_id, &hash).await.unwrap();
                assert_eq!(found, Some(created));
            });
        }
    }
}
