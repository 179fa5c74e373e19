/// PostgreSQL session store
///
/// The conditional rotation is a single `UPDATE ... RETURNING`, so the
/// database row lock decides which of two concurrent refreshes wins.

use super::SessionStore;
use crate::error::StoreResult;
use crate::models::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    refresh_token_hash TEXT NOT NULL UNIQUE,
    expiration TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions (user_id)";

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the sessions table and its user index if missing
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(CREATE_SESSIONS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_USER_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(
        &self,
        user_id: Uuid,
        refresh_token_hash: &str,
        expiration: DateTime<Utc>,
    ) -> StoreResult<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, refresh_token_hash, expiration, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, refresh_token_hash, expiration, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(refresh_token_hash)
        .bind(expiration)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_valid(&self, user_id: Uuid, refresh_token_hash: &str) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, refresh_token_hash, expiration, created_at
            FROM sessions
            WHERE user_id = $1 AND refresh_token_hash = $2 AND expiration > $3
            "#,
        )
        .bind(user_id)
        .bind(refresh_token_hash)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn rotate(
        &self,
        prior: &Session,
        new_refresh_token_hash: &str,
        new_expiration: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET refresh_token_hash = $4, expiration = $5
            WHERE id = $1 AND user_id = $2 AND refresh_token_hash = $3 AND expiration > $6
            RETURNING id, user_id, refresh_token_hash, expiration, created_at
            "#,
        )
        .bind(prior.id)
        .bind(prior.user_id)
        .bind(&prior.refresh_token_hash)
        .bind(new_refresh_token_hash)
        .bind(new_expiration)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete(&self, user_id: Uuid, refresh_token_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND refresh_token_hash = $2")
            .bind(user_id)
            .bind(refresh_token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn invalidate_all(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expiration <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
