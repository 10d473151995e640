//! Background worker persisting click events.

use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::LinkRepository;

/// Drains the click channel and records each event in the durable store.
///
/// At most `concurrency` writes are in flight. Failed writes are logged and
/// dropped: the redirect they belong to has already been served, and a retried
/// append could double count. Returns once the channel is closed and every
/// in-flight write has finished.
pub async fn run_click_worker(
    mut rx: mpsc::Receiver<ClickEvent>,
    repository: Arc<dyn LinkRepository>,
    concurrency: usize,
) {
    let concurrency = concurrency.max(1);
    let permits = Arc::new(Semaphore::new(concurrency));

    while let Some(event) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let repository = repository.clone();

        tokio::spawn(async move {
            let token = event.token.clone();

            match repository.record_click(event.into()).await {
                Ok(true) => {
                    debug!(token, "Click recorded");
                    metrics::counter!("click_writes_total", "outcome" => "recorded").increment(1);
                }
                Ok(false) => {
                    warn!(token, "Click for token without a durable record");
                    metrics::counter!("click_writes_total", "outcome" => "orphaned").increment(1);
                }
                Err(e) => {
                    error!(token, error = %e, "Failed to record click");
                    metrics::counter!("click_writes_total", "outcome" => "failed").increment(1);
                }
            }

            drop(permit);
        });
    }

    // Wait for in-flight writes before returning.
    let _ = permits.acquire_many(concurrency as u32).await;
    info!("Click worker stopped");
}
