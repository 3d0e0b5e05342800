use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, Client, RedisError};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cli::config::DedupSettings;

/// Errors raised by a dedup store. Any of these is fatal for a crawl.
#[derive(Debug, Error)]
pub enum DedupError {
    #[error("failed to connect to dedup store at {url}")]
    Connect {
        url: String,
        #[source]
        source: RedisError,
    },

    #[error("dedup store command {op} failed")]
    Command {
        op: &'static str,
        #[source]
        source: RedisError,
    },

    #[error("unsupported dedup store backend: {0}")]
    UnsupportedBackend(String),
}

/// Persistent record of every URL ever admitted, plus the checkpointed frontier.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Record `url` if it has never been recorded.
    ///
    /// Returns `true` when the record was newly created. The check and the
    /// insert are a single atomic operation.
    async fn exists_or_mark(&self, url: &str) -> Result<bool, DedupError>;

    /// Return the persisted pending list in order and clear it.
    async fn load_pending(&self) -> Result<Vec<String>, DedupError>;

    /// Atomically replace the persisted pending list. An empty slice clears it.
    async fn save_pending(&self, urls: &[String]) -> Result<(), DedupError>;

    /// Number of URLs ever recorded.
    async fn seen_count(&self) -> Result<usize, DedupError>;

    /// Length of the persisted pending list.
    async fn pending_count(&self) -> Result<usize, DedupError>;

    /// Drop every dedup record and the persisted pending list.
    async fn clear(&self) -> Result<(), DedupError>;
}

/// Factory for creating a dedup store from settings
pub struct DedupStoreFactory;

impl DedupStoreFactory {
    /// Create the store selected by `settings.backend`
    pub async fn create(settings: &DedupSettings) -> Result<Arc<dyn DedupStore>, DedupError> {
        match settings.backend.as_str() {
            "redis" => {
                let store = RedisDedupStore::new(settings).await?;
                Ok(Arc::new(store))
            }
            "memory" => Ok(Arc::new(MemoryDedupStore::new())),
            other => Err(DedupError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Redis implementation of the dedup store
pub struct RedisDedupStore {
    /// Set holding one member per recorded URL
    seen_key: String,

    /// List holding the checkpointed frontier, head first
    pending_key: String,

    /// Shared connection
    conn_pool: Arc<Mutex<MultiplexedConnection>>,
}

impl RedisDedupStore {
    /// Connect to Redis using the given settings
    pub async fn new(settings: &DedupSettings) -> Result<Self, DedupError> {
        let connect_err = |source| DedupError::Connect {
            url: settings.redis_url.clone(),
            source,
        };

        let client = Client::open(settings.redis_url.clone()).map_err(connect_err)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connect_err)?;

        debug!(url = %settings.redis_url, prefix = %settings.key_prefix, "Connected to Redis dedup store");

        Ok(Self {
            seen_key: format!("{}:seen", settings.key_prefix),
            pending_key: format!("{}:pending", settings.key_prefix),
            conn_pool: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl DedupStore for RedisDedupStore {
    async fn exists_or_mark(&self, url: &str) -> Result<bool, DedupError> {
        let mut conn = self.conn_pool.lock().await;

        // SADD reports 1 only for the caller that created the member
        let added: i64 = redis::cmd("SADD")
            .arg(&self.seen_key)
            .arg(url)
            .query_async(&mut *conn)
            .await
            .map_err(|source| DedupError::Command { op: "SADD", source })?;

        Ok(added == 1)
    }

    async fn load_pending(&self) -> Result<Vec<String>, DedupError> {
        let mut conn = self.conn_pool.lock().await;

        let (urls,): (Vec<String>,) = redis::pipe()
            .atomic()
            .cmd("LRANGE")
            .arg(&self.pending_key)
            .arg(0)
            .arg(-1)
            .cmd("DEL")
            .arg(&self.pending_key)
            .ignore()
            .query_async(&mut *conn)
            .await
            .map_err(|source| DedupError::Command { op: "LRANGE", source })?;

        debug!(count = urls.len(), "Loaded persisted pending list");

        Ok(urls)
    }

    async fn save_pending(&self, urls: &[String]) -> Result<(), DedupError> {
        let mut conn = self.conn_pool.lock().await;

        let mut pipe = redis::pipe();
        pipe.atomic().cmd("DEL").arg(&self.pending_key).ignore();
        if !urls.is_empty() {
            pipe.cmd("RPUSH").arg(&self.pending_key).arg(urls).ignore();
        }

        pipe.query_async::<_, ()>(&mut *conn)
            .await
            .map_err(|source| DedupError::Command { op: "RPUSH", source })?;

        debug!(count = urls.len(), "Saved persisted pending list");

        Ok(())
    }

    async fn seen_count(&self) -> Result<usize, DedupError> {
        let mut conn = self.conn_pool.lock().await;

        redis::cmd("SCARD")
            .arg(&self.seen_key)
            .query_async(&mut *conn)
            .await
            .map_err(|source| DedupError::Command { op: "SCARD", source })
    }

    async fn pending_count(&self) -> Result<usize, DedupError> {
        let mut conn = self.conn_pool.lock().await;

        redis::cmd("LLEN")
            .arg(&self.pending_key)
            .query_async(&mut *conn)
            .await
            .map_err(|source| DedupError::Command { op: "LLEN", source })
    }

    async fn clear(&self) -> Result<(), DedupError> {
        let mut conn = self.conn_pool.lock().await;

        redis::cmd("DEL")
            .arg(&self.seen_key)
            .arg(&self.pending_key)
            .query_async::<_, ()>(&mut *conn)
            .await
            .map_err(|source| DedupError::Command { op: "DEL", source })?;

        debug!("Cleared dedup records and pending list");

        Ok(())
    }
}

/// In-process store. Nothing survives the process; used for dry runs and tests.
#[derive(Default)]
pub struct MemoryDedupStore {
    seen: Mutex<HashSet<String>>,
    pending: Mutex<Vec<String>>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn exists_or_mark(&self, url: &str) -> Result<bool, DedupError> {
        Ok(self.seen.lock().await.insert(url.to_string()))
    }

    async fn load_pending(&self) -> Result<Vec<String>, DedupError> {
        Ok(std::mem::take(&mut *self.pending.lock().await))
    }

    async fn save_pending(&self, urls: &[String]) -> Result<(), DedupError> {
        *self.pending.lock().await = urls.to_vec();
        Ok(())
    }

    async fn seen_count(&self) -> Result<usize, DedupError> {
        Ok(self.seen.lock().await.len())
    }

    async fn pending_count(&self) -> Result<usize, DedupError> {
        Ok(self.pending.lock().await.len())
    }

    async fn clear(&self) -> Result<(), DedupError> {
        self.seen.lock().await.clear();
        self.pending.lock().await.clear();
        Ok(())
    }
}
