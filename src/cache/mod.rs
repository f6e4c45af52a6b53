//! OAuth handshake stash
//!
//! Short-lived correlation state bridging the OAuth initiate and callback
//! steps. Entries are keyed by the per-handshake anti-forgery `state`
//! value and consumed at most once; an entry that is never consumed
//! expires after [`HANDSHAKE_TTL`], failing the late callback closed.

use crate::config::RedisConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Cache key prefixes
mod keys {
    pub const HANDSHAKE: &str = "formgate:oauth:handshake";
}

/// How long an unconsumed handshake entry stays retrievable
pub const HANDSHAKE_TTL: Duration = Duration::from_secs(60);

/// Stashed context for one in-flight handshake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeEntry {
    pub instance_hash: String,
    pub redirect_uri: String,
}

/// Keyed, TTL-bound store for in-flight handshakes
#[async_trait]
pub trait HandshakeStore: Send + Sync {
    async fn put(&self, state: &str, entry: &HandshakeEntry) -> Result<()>;
    /// Read-and-delete: a second take for the same state returns `None`.
    async fn take(&self, state: &str) -> Result<Option<HandshakeEntry>>;
}

/// Production handshake store backed by Redis
#[derive(Clone)]
pub struct RedisHandshakeStore {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisHandshakeStore {
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create Redis client: {}", e))
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to connect to Redis: {}", e))
        })?;

        Ok(Self {
            conn,
            ttl: HANDSHAKE_TTL,
        })
    }

    fn key(state: &str) -> String {
        format!("{}:{}", keys::HANDSHAKE, state)
    }
}

#[async_trait]
impl HandshakeStore for RedisHandshakeStore {
    async fn put(&self, state: &str, entry: &HandshakeEntry) -> Result<()> {
        let mut conn = self.conn.clone();
        let serialized = serde_json::to_string(entry)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Stash serialize error: {}", e)))?;

        let _: () = redis::cmd("SET")
            .arg(Self::key(state))
            .arg(serialized)
            .arg("EX")
            .arg(self.ttl.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn take(&self, state: &str) -> Result<Option<HandshakeEntry>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(Self::key(state))
            .query_async(&mut conn)
            .await?;

        match value {
            Some(v) => {
                let parsed = serde_json::from_str(&v).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Stash deserialize error: {}", e))
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }
}

/// In-memory handshake store with the same consume-once/TTL contract.
/// Expiry is deterministic in tests by constructing it with a zero TTL.
pub struct MemoryHandshakeStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, (HandshakeEntry, Instant)>>,
}

impl MemoryHandshakeStore {
    pub fn new() -> Self {
        Self::with_ttl(HANDSHAKE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryHandshakeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HandshakeStore for MemoryHandshakeStore {
    async fn put(&self, state: &str, entry: &HandshakeEntry) -> Result<()> {
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .lock()
            .await
            .insert(state.to_string(), (entry.clone(), expires_at));
        Ok(())
    }

    async fn take(&self, state: &str) -> Result<Option<HandshakeEntry>> {
        let removed = self.entries.lock().await.remove(state);
        Ok(removed.and_then(|(entry, expires_at)| {
            if Instant::now() < expires_at {
                Some(entry)
            } else {
                None
            }
        }))
    }
}
