//! Redis-backed key-value store.

use super::service::{CacheError, CacheResult, KeyValueStore};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, info, warn};

/// Redis implementation of [`KeyValueStore`].
///
/// Uses `ConnectionManager` for a shared, self-reconnecting connection. Errors are
/// logged and returned; callers decide how to degrade.
pub struct RedisStore {
    client: ConnectionManager,
}

impl RedisStore {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self { client: manager })
    }
}

fn operation_error(command: &str, key: &str, e: redis::RedisError) -> CacheError {
    warn!("Redis {} error for {}: {}", command, key, e);
    if e.is_io_error() {
        CacheError::ConnectionError(e.to_string())
    } else {
        CacheError::OperationError(e.to_string())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.client.clone();

        let value = conn
            .get::<_, Option<String>>(key)
            .await
            .map_err(|e| operation_error("GET", key, e))?;

        match &value {
            Some(_) => debug!("Cache HIT: {}", key),
            None => debug!("Cache MISS: {}", key),
        }

        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut conn = self.client.clone();

        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(|e| operation_error("SET", key, e))?;

        debug!("Cache SET: {} (TTL: {}s)", key, ttl_seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.client.clone();

        let deleted = conn
            .del::<_, i64>(key)
            .await
            .map_err(|e| operation_error("DEL", key, e))?;

        if deleted > 0 {
            debug!("Cache DEL: {}", key);
        }

        Ok(deleted > 0)
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.client.clone();

        conn.incr::<_, _, i64>(key, 1i64)
            .await
            .map_err(|e| operation_error("INCR", key, e))
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool> {
        let mut conn = self.client.clone();

        conn.expire::<_, bool>(key, ttl_seconds as i64)
            .await
            .map_err(|e| operation_error("EXPIRE", key, e))
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
