//! Login sessions: opaque bearer tokens mapped to a user id with a TTL.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Longest lifetime any session gets; longer TTLs are clamped to it.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("corrupt session record for {token}: {value}")]
    Corrupt { token: String, value: String },
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Issues a new token for `user_id` that expires after `ttl`.
    async fn start(&self, user_id: Uuid, ttl: Duration) -> Result<String, SessionError>;
    /// Invalidates `token`. Ending an unknown token is not an error.
    async fn end(&self, token: &str) -> Result<(), SessionError>;
    /// The user a live token belongs to; `None` for unknown or expired tokens.
    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, SessionError>;
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Redis
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
}

impl RedisSessionStore {
    pub async fn connect(client: &redis::Client) -> Result<Self, SessionError> {
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }

    fn key(token: &str) -> String {
        format!("session:{token}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn start(&self, user_id: Uuid, ttl: Duration) -> Result<String, SessionError> {
        let token = new_token();
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::key(&token))
            .arg(user_id.to_string())
            .arg("EX")
            .arg(ttl.min(MAX_SESSION_TTL).as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(token)
    }

    async fn end(&self, token: &str) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(Self::key(token))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, SessionError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(Self::key(token))
            .query_async(&mut conn)
            .await?;
        match value {
            None => Ok(None),
            Some(raw) => Uuid::parse_str(&raw)
                .map(Some)
                .map_err(|_| SessionError::Corrupt {
                    token: token.to_string(),
                    value: raw,
                }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct LiveSession {
    user_id: Uuid,
    expires_at: Instant,
}

/// Process-local sessions. Expired entries are dropped when they are next
/// looked up or when a new session is started.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, LiveSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn start(&self, user_id: Uuid, ttl: Duration) -> Result<String, SessionError> {
        let token = new_token();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(
            token.clone(),
            LiveSession {
                user_id,
                expires_at: now + ttl.min(MAX_SESSION_TTL),
            },
        );
        Ok(token)
    }

    async fn end(&self, token: &str) -> Result<(), SessionError> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, SessionError> {
        let live = self.sessions.read().await.get(token).cloned();
        match live {
            Some(s) if s.expires_at > Instant::now() => Ok(Some(s.user_id)),
            Some(_) => {
                self.sessions.write().await.remove(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
