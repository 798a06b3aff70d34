//! User storage. The registry talks to accounts only through `UserStore`.
//!
//! `PgUserStore` is the production backend. `InMemoryUserStore` backs tests
//! and `serve --in-memory`; it enforces the same uniqueness rules as the
//! table constraints.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::user::{NewUserRecord, User};

/// Constraint names created by `db::init_schema`.
pub const USERNAME_CONSTRAINT: &str = "users_username_key";
pub const EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0:?}")]
    UniqueViolation(UniqueField),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("user {0} does not exist")]
    Missing(Uuid),
}

/// Maps a Postgres unique violation on the users table to the field it
/// guards; any other error passes through unchanged.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(USERNAME_CONSTRAINT) => {
                    return StoreError::UniqueViolation(UniqueField::Username)
                }
                Some(EMAIL_CONSTRAINT) => return StoreError::UniqueViolation(UniqueField::Email),
                _ => {}
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Exact match; callers pass the normalized (lowercase) name.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Stores a new account, assigning `id` and `created_at`.
    async fn insert(&self, record: NewUserRecord) -> Result<User, StoreError>;
    /// Persists the mutable fields of an existing account.
    async fn save(&self, user: &User) -> Result<(), StoreError>;
    /// Writes `last_login` alone, leaving every other column untouched.
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
    /// Writes `password_hash` alone.
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;
    /// All accounts, oldest first.
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert(&self, record: NewUserRecord) -> Result<User, StoreError> {
        // Single statement, so a failure leaves nothing behind.
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (id, username, email, password_hash, first_name, last_name, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        // created_at is write-once.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, first_name = $5,
                last_name = $6, is_active = $7, last_login = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(user.id));
        }
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, username")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflicting_field(
    users: &HashMap<Uuid, User>,
    id: Option<Uuid>,
    username: &str,
    email: &str,
) -> Option<UniqueField> {
    let others = || users.values().filter(move |u| Some(u.id) != id);
    if others().any(|u| u.username == username) {
        return Some(UniqueField::Username);
    }
    if others().any(|u| u.email == email) {
        return Some(UniqueField::Email);
    }
    None
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, record: NewUserRecord) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if let Some(field) = conflicting_field(&users, None, &record.username, &record.email) {
            return Err(StoreError::UniqueViolation(field));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: record.username,
            email: record.email,
            password_hash: record.password_hash,
            first_name: record.first_name,
            last_name: record.last_name,
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(field) = conflicting_field(&users, Some(user.id), &user.username, &user.email) {
            return Err(StoreError::UniqueViolation(field));
        }
        let existing = users.get_mut(&user.id).ok_or(StoreError::Missing(user.id))?;
        let created_at = existing.created_at;
        *existing = User {
            created_at,
            ..user.clone()
        };
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::Missing(id))?;
        user.last_login = Some(at);
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::Missing(id))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(users)
    }
}
