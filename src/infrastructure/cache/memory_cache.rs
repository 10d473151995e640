//! In-process key-value store with per-key expiry.

use super::service::{CacheError, CacheResult, KeyValueStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// A [`KeyValueStore`] held in process memory.
///
/// Follows Redis semantics for `INCR` (missing key starts at 1, no expiry) and
/// `EXPIRE` (absent key reports false). Expired entries are dropped lazily on
/// access. Time is read from `tokio::time`, so tests can pause and advance it.
///
/// Used when Redis is not configured. State is local to the process, so rate
/// limits and cached tokens are not shared between instances.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        debug!("Using in-process key-value store");
        Self::default()
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::OperationError("memory store lock poisoned".to_string()))
    }

    /// Deadline `ttl_seconds` after `now`, or `InvalidTtl` if it is not representable.
    fn deadline(now: Instant, ttl_seconds: u64) -> CacheResult<Instant> {
        now.checked_add(Duration::from_secs(ttl_seconds))
            .ok_or_else(|| CacheError::InvalidTtl(i64::try_from(ttl_seconds).unwrap_or(i64::MAX)))
    }

    /// Returns the live entry for `key`, dropping it if it has expired.
    fn live<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.lock()?;
        Ok(Self::live(&mut entries, key, Instant::now()).map(|e| e.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let expires_at = Self::deadline(Instant::now(), ttl_seconds)?;
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        Ok(entries.remove(key).is_some_and(|e| e.is_live(now)))
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut entries = self.lock()?;
        let now = Instant::now();

        match Self::live(&mut entries, key, now) {
            Some(entry) => {
                let current: i64 = entry.value.parse().map_err(|_| {
                    CacheError::OperationError(format!("value at {} is not an integer", key))
                })?;
                let next = current + 1;
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool> {
        let mut entries = self.lock()?;
        let now = Instant::now();

        match Self::live(&mut entries, key, now) {
            Some(entry) => {
                entry.expires_at = Some(Self::deadline(now, ttl_seconds)?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> bool {
        self.lock().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_ex_expires() {
        let store = MemoryStore::new();
        store.set_ex("url:abc", "https://example.com", 10).await.unwrap();

        assert_eq!(
            store.get("url:abc").await.unwrap().as_deref(),
            Some("https://example.com")
        );

        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(store.get("url:abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_ex_overwrites() {
        let store = MemoryStore::new();
        store.set_ex("k", "one", 60).await.unwrap();
        store.set_ex("k", "two", 60).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_keeps_expiry() {
        let store = MemoryStore::new();

        assert_eq!(store.incr("rl").await.unwrap(), 1);
        assert!(store.expire("rl", 60).await.unwrap());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.incr("rl").await.unwrap(), 2);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.incr("rl").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_rejects_non_integer() {
        let store = MemoryStore::new();
        store.set_ex("k", "not-a-number", 60).await.unwrap();

        assert!(matches!(
            store.incr("k").await,
            Err(CacheError::OperationError(_))
        ));
    }

    #[tokio::test]
    async fn test_expire_missing_key() {
        let store = MemoryStore::new();
        assert!(!store.expire("missing", 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_is_rejected() {
        let store = MemoryStore::new();

        assert!(matches!(
            store.set_ex("k", "v", u64::MAX).await,
            Err(CacheError::InvalidTtl(i64::MAX))
        ));
        assert!(store.get("k").await.unwrap().is_none());

        store.incr("rl").await.unwrap();
        assert!(matches!(
            store.expire("rl", u64::MAX).await,
            Err(CacheError::InvalidTtl(_))
        ));
    }
}
