//! Key-value cache connection manager
//!
//! Owns a `deadpool-redis` pool and the shared [`CacheClient`] wrapped
//! around it. Pool creation does not connect; connections open on first use.
//! No retry or reconnect logic lives here: a dropped connection surfaces as a
//! [`CacheError`] at the call site.

use std::fmt;
use std::time::Duration;

use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use groundwork_core::RedisSettings;
use parking_lot::RwLock;
use tracing::info;

use crate::lifecycle::{ManagerState, Phase};

/// Errors raised by the cache manager and client
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache manager is not initialized; call init() first")]
    NotInitialized,

    #[error("cache manager is already initialized")]
    AlreadyInitialized,

    #[error("failed to build cache pool: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    #[error("failed to get cache connection: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("cache command failed: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Shared handle for issuing cache commands. Cheap to clone.
#[derive(Clone)]
pub struct CacheClient {
    pool: Pool,
}

impl CacheClient {
    /// Check out a pooled connection for arbitrary commands.
    pub async fn connection(&self) -> Result<Connection, CacheError> {
        Ok(self.pool.get().await?)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        Ok(conn.get(key).await?)
    }

    /// Store `value` under `key`, expiring after `ttl` when given.
    ///
    /// Sub-second TTLs round up to one second.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        match ttl {
            Some(ttl) => {
                let seconds = ttl.as_secs().max(1);
                let _: () = conn.set_ex(key, value, seconds).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    /// Remove `key`. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    /// Round-trip a PING.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

impl fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.pool.status();
        f.debug_struct("CacheClient")
            .field("size", &status.size)
            .field("max_size", &status.max_size)
            .finish()
    }
}

struct CacheHandles {
    pool: Pool,
    client: CacheClient,
}

/// Lifecycle owner for the cache pool and client.
pub struct CacheManager {
    settings: RedisSettings,
    state: RwLock<ManagerState<CacheHandles>>,
}

impl CacheManager {
    pub fn new(settings: RedisSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(ManagerState::Uninitialized),
        }
    }

    /// Build the pool and client. Fails if already ready.
    pub fn init(&self) -> Result<(), CacheError> {
        let mut state = self.state.write();
        if state.ready().is_some() {
            return Err(CacheError::AlreadyInitialized);
        }

        let mut config = Config::from_url(self.settings.dsn());
        config.pool = Some(PoolConfig::new(self.settings.max_connections));
        let pool = config.create_pool(Some(Runtime::Tokio1))?;
        let client = CacheClient { pool: pool.clone() };
        *state = ManagerState::Ready(CacheHandles { pool, client });

        info!(
            host = %self.settings.host,
            db = self.settings.db,
            max_connections = self.settings.max_connections,
            "Cache pool initialized"
        );
        Ok(())
    }

    /// Shared client handle
    pub fn client(&self) -> Result<CacheClient, CacheError> {
        self.state
            .read()
            .ready()
            .map(|handles| handles.client.clone())
            .ok_or(CacheError::NotInitialized)
    }

    pub fn phase(&self) -> Phase {
        self.state.read().phase()
    }

    /// Release the client, then close the pool. Safe to call when not ready.
    pub fn close(&self) {
        let handles = self.state.write().close();
        if let Some(CacheHandles { pool, client }) = handles {
            drop(client);
            pool.close();
            info!("Cache pool closed");
        }
    }
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
