//! Store doubles for exercising failure paths.

use async_trait::async_trait;

use super::service::{CacheError, CacheResult, KeyValueStore};

/// A store whose every command fails as if the server refused the connection.
pub struct UnreachableStore;

fn refused<T>() -> CacheResult<T> {
    Err(CacheError::ConnectionError("connection refused".to_string()))
}

#[async_trait]
impl KeyValueStore for UnreachableStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        refused()
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_seconds: u64) -> CacheResult<()> {
        refused()
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        refused()
    }

    async fn incr(&self, _key: &str) -> CacheResult<i64> {
        refused()
    }

    async fn expire(&self, _key: &str, _ttl_seconds: u64) -> CacheResult<bool> {
        refused()
    }

    async fn health_check(&self) -> bool {
        false
    }
}
