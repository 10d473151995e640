//! Token to URL lookup table backing the redirect path.

use std::sync::Arc;
use std::time::Duration;

use super::service::{CacheError, CacheResult, KeyValueStore};

const KEY_PREFIX: &str = "url:";

/// Adapter over a [`KeyValueStore`] holding `token -> original_url` entries,
/// each expiring with the declared lifetime of its link.
///
/// Authoritative for redirects: a miss here is a not-found, whatever the
/// record store says.
#[derive(Clone)]
pub struct ResolutionCache {
    store: Arc<dyn KeyValueStore>,
    timeout: Duration,
}

impl ResolutionCache {
    pub fn new(store: Arc<dyn KeyValueStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    fn key(token: &str) -> String {
        format!("{}{}", KEY_PREFIX, token)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = CacheResult<T>>,
    ) -> CacheResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(operation))?
    }

    /// Upserts the entry for `token`.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidTtl`] if `ttl_seconds <= 0`; the store is not touched.
    pub async fn put(&self, token: &str, url: &str, ttl_seconds: i64) -> CacheResult<()> {
        if ttl_seconds <= 0 {
            return Err(CacheError::InvalidTtl(ttl_seconds));
        }

        let key = Self::key(token);
        self.bounded("put", self.store.set_ex(&key, url, ttl_seconds as u64))
            .await
    }

    /// Returns the destination stored for `token`.
    ///
    /// # Errors
    ///
    /// [`CacheError::Miss`] if the entry is absent or expired.
    pub async fn get(&self, token: &str) -> CacheResult<String> {
        let key = Self::key(token);
        self.bounded("get", self.store.get(&key))
            .await?
            .ok_or(CacheError::Miss)
    }

    /// Evicts the entry for `token`. Absence is not an error.
    pub async fn delete(&self, token: &str) -> CacheResult<()> {
        let key = Self::key(token);
        self.bounded("delete", self.store.delete(&key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::MemoryStore;
    use async_trait::async_trait;

    fn cache() -> ResolutionCache {
        ResolutionCache::new(Arc::new(MemoryStore::new()), Duration::from_millis(250))
    }

    struct StalledStore;

    #[async_trait]
    impl KeyValueStore for StalledStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            std::future::pending().await
        }
        async fn set_ex(&self, _key: &str, _value: &str, _ttl: u64) -> CacheResult<()> {
            std::future::pending().await
        }
        async fn delete(&self, _key: &str) -> CacheResult<bool> {
            std::future::pending().await
        }
        async fn incr(&self, _key: &str) -> CacheResult<i64> {
            std::future::pending().await
        }
        async fn expire(&self, _key: &str, _ttl: u64) -> CacheResult<bool> {
            std::future::pending().await
        }
        async fn health_check(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = cache();
        cache.put("0a1b2c3d", "https://example.com", 60).await.unwrap();

        assert_eq!(cache.get("0a1b2c3d").await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn test_put_rejects_non_positive_ttl() {
        let cache = cache();

        assert!(matches!(
            cache.put("0a1b2c3d", "https://example.com", 0).await,
            Err(CacheError::InvalidTtl(0))
        ));
        assert!(matches!(
            cache.put("0a1b2c3d", "https://example.com", -5).await,
            Err(CacheError::InvalidTtl(-5))
        ));
        assert!(matches!(cache.get("0a1b2c3d").await, Err(CacheError::Miss)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_a_miss() {
        let cache = cache();
        cache.put("0a1b2c3d", "https://example.com", 5).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(matches!(cache.get("0a1b2c3d").await, Err(CacheError::Miss)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = cache();
        cache.put("0a1b2c3d", "https://example.com", 60).await.unwrap();

        cache.delete("0a1b2c3d").await.unwrap();
        cache.delete("0a1b2c3d").await.unwrap();

        assert!(matches!(cache.get("0a1b2c3d").await, Err(CacheError::Miss)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_times_out() {
        let cache = ResolutionCache::new(Arc::new(StalledStore), Duration::from_millis(250));

        assert!(matches!(
            cache.get("0a1b2c3d").await,
            Err(CacheError::Timeout("get"))
        ));
    }
}
