//! Key-value store trait and error types.

use async_trait::async_trait;
use serde_json::json;

use crate::error::AppError;

/// Errors that can occur during key-value operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    #[error("Cache operation error: {0}")]
    OperationError(String),

    #[error("Cache operation timed out: {0}")]
    Timeout(&'static str),

    /// A TTL of zero or less, or one too large to schedule, was requested.
    #[error("TTL must be positive, got {0}")]
    InvalidTtl(i64),

    /// Key absent or expired. The two are indistinguishable.
    #[error("Cache entry not found")]
    Miss,
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Miss => AppError::not_found("URL not found or expired", json!({})),
            CacheError::InvalidTtl(ttl) => AppError::bad_request(
                "Expiration must be greater than 0",
                json!({ "expiration": ttl }),
            ),
            other => {
                tracing::error!(error = %other, "Key-value store unavailable");
                AppError::unavailable("Cache unavailable", json!({}))
            }
        }
    }
}

/// Minimal key-value store contract shared by the resolution cache and the
/// rate limiter.
///
/// Unlike a best-effort cache, failures are reported to the caller: the store is
/// authoritative for redirect-time lookups.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisStore`] - Redis via `ConnectionManager`
/// - [`crate::infrastructure::cache::MemoryStore`] - In-process map with TTLs
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value of a live key.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Upserts `key` with an expiry of `ttl_seconds`.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()>;

    /// Removes `key`. Returns whether something was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Atomically increments an integer counter, creating it at 1 without
    /// expiry if absent. Returns the new value.
    async fn incr(&self, key: &str) -> CacheResult<i64>;

    /// Sets the expiry of an existing key. Returns false if the key is absent.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool>;

    /// Checks if the backend answers.
    async fn health_check(&self) -> bool;
}
