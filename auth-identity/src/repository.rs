use crate::{error::*, models::*};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Read access to the external user directory.
///
/// `find_by_email` and `create_user` exist only so the development
/// auto-login identity can be provisioned; the session core itself only
/// resolves identities by id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<Identity>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>>;
    async fn create_user(&self, user: NewIdentity) -> Result<Identity>;
}

/// In-memory directory for development and tests
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<DashMap<Uuid, Identity>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already materialized identity, replacing any previous one
    /// with the same id.
    pub fn insert(&self, identity: Identity) {
        self.users.insert(identity.id, identity);
    }

    pub fn remove(&self, id: Uuid) -> Option<Identity> {
        self.users.remove(&id).map(|(_, identity)| identity)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<Identity>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.email.eq_ignore_ascii_case(email))
            .map(|entry| entry.value().clone()))
    }

    async fn create_user(&self, user: NewIdentity) -> Result<Identity> {
        if !is_valid_email(&user.email) {
            return Err(IdentityError::InvalidEmail);
        }
        if self.find_by_email(&user.email).await?.is_some() {
            return Err(IdentityError::UserAlreadyExists);
        }

        let identity = user.into_identity();
        self.users.insert(identity.id, identity.clone());
        Ok(identity)
    }
}

/// PostgreSQL-backed directory reading the `users` table
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    username: Option<String>,
    display_name: Option<String>,
    role: String,
    email_verified: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for Identity {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            display_name: row.display_name,
            role: Role::parse(&row.role),
            email_verified: row.email_verified,
            created_at: row.created_at,
        }
    }
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, username, display_name, role, email_verified, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Identity::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, username, display_name, role, email_verified, created_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Identity::from))
    }

    async fn create_user(&self, user: NewIdentity) -> Result<Identity> {
        if !is_valid_email(&user.email) {
            return Err(IdentityError::InvalidEmail);
        }

        let identity = user.into_identity();
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, username, display_name, role, email_verified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(identity.id)
        .bind(&identity.email)
        .bind(&identity.username)
        .bind(&identity.display_name)
        .bind(identity.role.as_str())
        .bind(identity.email_verified)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::UserAlreadyExists);
        }
        Ok(identity)
    }
}

fn is_valid_email(email: &str) -> bool {
    email.contains('@') && !email.starts_with('@') && !email.ends_with('@')
}
