//! Deadlines and retries for calls that cross an I/O boundary.

use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::error::AppError;

/// Attempts after the first call for idempotent operations.
const MAX_RETRIES: usize = 3;

/// Runs `fut` under `deadline`, reporting expiry as [`AppError::Unavailable`].
pub async fn with_deadline<T, F>(deadline: Duration, operation: &'static str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, deadline_ms = deadline.as_millis() as u64, "I/O deadline exceeded");
            Err(AppError::unavailable(
                "Upstream store timed out",
                json!({ "operation": operation }),
            ))
        }
    }
}

/// Retries an idempotent operation on transient failures with jittered backoff.
///
/// Only [`AppError::Unavailable`] is retried. Never use this for writes with
/// non-idempotent side effects.
pub async fn retry_idempotent<T, A, Fut>(action: A) -> Result<T, AppError>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let strategy = ExponentialBackoff::from_millis(10)
        .max_delay(Duration::from_millis(200))
        .map(jitter)
        .take(MAX_RETRIES);

    RetryIf::spawn(strategy, action, |e: &AppError| e.is_transient()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out() {
        let result: Result<(), AppError> = with_deadline(Duration::from_millis(50), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AppError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result = with_deadline(Duration::from_secs(1), "fast", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = retry_idempotent(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AppError::unavailable("flaky", json!({})))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_skips_permanent_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), AppError> = retry_idempotent(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::not_found("missing", json!({})))
            }
        })
        .await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_limit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), AppError> = retry_idempotent(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::unavailable("down", json!({})))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }
}
