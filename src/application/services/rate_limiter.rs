//! Fixed-window request limiter keyed by client IP.

use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::infrastructure::cache::{CacheError, CacheResult, KeyValueStore};

const KEY_PREFIX: &str = "rate_limit:";

/// What to do with a request when the counter store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    /// Admit the request.
    Open,
    /// Refuse the request with [`AppError::Unavailable`].
    Closed,
}

impl FailMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for FailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown fail mode '{}', expected open or closed", other)),
        }
    }
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// `count` is zero when the store failed and the limiter is fail-open.
    Admitted { count: i64, remaining: i64 },
    Rejected { count: i64 },
}

impl RateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

/// Per-IP fixed window counter on a shared [`KeyValueStore`].
///
/// The first request of a window creates the counter and sets its expiry.
/// Later requests only increment it, so the window never slides. A request is
/// admitted while the incremented count stays at or below `limit`.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    limit: i64,
    window: Duration,
    timeout: Duration,
    fail_mode: FailMode,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        limit: i64,
        window: Duration,
        timeout: Duration,
        fail_mode: FailMode,
    ) -> Self {
        Self {
            store,
            limit,
            window,
            timeout,
            fail_mode,
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
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

    async fn count(&self, key: &str) -> CacheResult<i64> {
        let count = self.bounded("incr", self.store.incr(key)).await?;

        if count == 1 {
            let window = self.window.as_secs().max(1);
            if let Err(e) = self.bounded("expire", self.store.expire(key, window)).await {
                // A counter without expiry would lock the client out for good.
                let _ = self.bounded("delete", self.store.delete(key)).await;
                return Err(e);
            }
        }

        Ok(count)
    }

    /// Counts a request from `client_ip` and decides whether it may proceed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] only when the store fails and the
    /// limiter is fail-closed.
    pub async fn check(&self, client_ip: &str) -> Result<RateDecision, AppError> {
        let key = format!("{}{}", KEY_PREFIX, client_ip);

        match self.count(&key).await {
            Ok(count) if count > self.limit => {
                debug!(client_ip, count, "Rate limit exceeded");
                metrics::counter!("rate_limit_rejections_total").increment(1);
                Ok(RateDecision::Rejected { count })
            }
            Ok(count) => Ok(RateDecision::Admitted {
                count,
                remaining: self.limit - count,
            }),
            Err(e) => {
                warn!(
                    client_ip,
                    error = %e,
                    policy = self.fail_mode.as_str(),
                    "Rate limiter store error"
                );
                metrics::counter!(
                    "rate_limit_store_errors_total",
                    "policy" => self.fail_mode.as_str()
                )
                .increment(1);

                match self.fail_mode {
                    FailMode::Open => Ok(RateDecision::Admitted {
                        count: 0,
                        remaining: self.limit,
                    }),
                    FailMode::Closed => Err(AppError::unavailable(
                        "Rate limiter unavailable",
                        json!({}),
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::MemoryStore;
    use crate::infrastructure::cache::testing::UnreachableStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn limiter(store: Arc<dyn KeyValueStore>, fail_mode: FailMode) -> RateLimiter {
        RateLimiter::new(
            store,
            2,
            Duration::from_secs(60),
            Duration::from_millis(100),
            fail_mode,
        )
    }

    /// Store whose INCR works but whose EXPIRE fails, recording deletions.
    #[derive(Default)]
    struct BrokenExpireStore {
        inner: MemoryStore,
        deleted: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for BrokenExpireStore {
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            self.inner.get(key).await
        }
        async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> CacheResult<()> {
            self.inner.set_ex(key, value, ttl).await
        }
        async fn delete(&self, key: &str) -> CacheResult<bool> {
            self.deleted.store(true, Ordering::SeqCst);
            self.inner.delete(key).await
        }
        async fn incr(&self, key: &str) -> CacheResult<i64> {
            self.inner.incr(key).await
        }
        async fn expire(&self, _key: &str, _ttl: u64) -> CacheResult<bool> {
            Err(CacheError::ConnectionError("connection reset".to_string()))
        }
        async fn health_check(&self) -> bool {
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_request_in_window_is_rejected() {
        let limiter = limiter(Arc::new(MemoryStore::new()), FailMode::Open);

        assert_eq!(
            limiter.check("10.0.0.1").await.unwrap(),
            RateDecision::Admitted {
                count: 1,
                remaining: 1
            }
        );
        assert_eq!(
            limiter.check("10.0.0.1").await.unwrap(),
            RateDecision::Admitted {
                count: 2,
                remaining: 0
            }
        );
        assert_eq!(
            limiter.check("10.0.0.1").await.unwrap(),
            RateDecision::Rejected { count: 3 }
        );

        // Other clients have their own window.
        assert!(limiter.check("10.0.0.2").await.unwrap().is_admitted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_does_not_slide() {
        let limiter = limiter(Arc::new(MemoryStore::new()), FailMode::Open);

        limiter.check("10.0.0.1").await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;
        limiter.check("10.0.0.1").await.unwrap();
        assert!(!limiter.check("10.0.0.1").await.unwrap().is_admitted());

        // The window opened by the first request ends at 60s regardless of later hits.
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(
            limiter.check("10.0.0.1").await.unwrap(),
            RateDecision::Admitted {
                count: 1,
                remaining: 1
            }
        );
    }

    #[tokio::test]
    async fn test_fail_open_admits_when_store_is_down() {
        let limiter = limiter(Arc::new(UnreachableStore), FailMode::Open);

        assert!(limiter.check("10.0.0.1").await.unwrap().is_admitted());
    }

    #[tokio::test]
    async fn test_fail_closed_refuses_when_store_is_down() {
        let limiter = limiter(Arc::new(UnreachableStore), FailMode::Closed);

        let result = limiter.check("10.0.0.1").await;

        assert!(matches!(result, Err(AppError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_failed_expire_removes_counter() {
        let store = Arc::new(BrokenExpireStore::default());
        let limiter = limiter(store.clone(), FailMode::Open);

        assert!(limiter.check("10.0.0.1").await.unwrap().is_admitted());

        assert!(store.deleted.load(Ordering::SeqCst));
        assert!(store.inner.get("rate_limit:10.0.0.1").await.unwrap().is_none());
    }

    #[test]
    fn test_fail_mode_parse() {
        assert_eq!("open".parse::<FailMode>().unwrap(), FailMode::Open);
        assert_eq!(" CLOSED ".parse::<FailMode>().unwrap(), FailMode::Closed);
        assert!("sometimes".parse::<FailMode>().is_err());
    }
}
