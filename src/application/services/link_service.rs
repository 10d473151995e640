//! Link lifecycle across the resolution cache and the record store.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::application::services::rate_limiter::{RateDecision, RateLimiter};
use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{Click, Link, LinkPatch, MAX_EXPIRATION_SECONDS, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::ResolutionCache;
use crate::utils::io::retry_idempotent;
use crate::utils::token_generator;

/// Token generation attempts before giving up on collisions.
const MAX_TOKEN_ATTEMPTS: usize = 10;

/// A link together with its click ledger.
#[derive(Debug, Clone)]
pub struct LinkDetails {
    pub link: Link,
    pub clicks: Vec<Click>,
}

/// One page of an owner's links.
#[derive(Debug, Clone)]
pub struct LinkPage {
    pub links: Vec<Link>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Result of [`LinkService::reconcile_cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub rewritten: usize,
    pub failed: usize,
}

/// Orchestrates link creation, resolution, update and deletion.
///
/// The resolution cache answers redirects; the record store owns everything
/// else. No transaction spans the two, so every write picks an order:
///
/// - create: record store, then cache (a failed cache write deletes the record)
/// - update: cache, then record store
/// - delete: record store, then cache eviction
pub struct LinkService {
    repository: Arc<dyn LinkRepository>,
    cache: ResolutionCache,
    limiter: RateLimiter,
    click_sender: mpsc::Sender<ClickEvent>,
    base_url: String,
}

impl LinkService {
    pub fn new(
        repository: Arc<dyn LinkRepository>,
        cache: ResolutionCache,
        limiter: RateLimiter,
        click_sender: mpsc::Sender<ClickEvent>,
        base_url: String,
    ) -> Self {
        Self {
            repository,
            cache,
            limiter,
            click_sender,
            base_url,
        }
    }

    /// Externally addressable short link for `token`.
    pub fn short_url(&self, token: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), token)
    }

    fn validate(original_url: &str, expiration_seconds: i64) -> Result<(), AppError> {
        if original_url.trim().is_empty() {
            return Err(AppError::bad_request(
                "Original URL is required",
                json!({ "field": "originalUrl" }),
            ));
        }

        let parsed = Url::parse(original_url).map_err(|e| {
            AppError::bad_request(
                "Invalid URL format",
                json!({ "field": "originalUrl", "reason": e.to_string() }),
            )
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::bad_request(
                "Only http and https URLs are supported",
                json!({ "field": "originalUrl", "scheme": parsed.scheme() }),
            ));
        }

        if expiration_seconds <= 0 {
            return Err(AppError::bad_request(
                "Expiration must be greater than 0",
                json!({ "field": "expiration", "value": expiration_seconds }),
            ));
        }

        if expiration_seconds > MAX_EXPIRATION_SECONDS {
            return Err(AppError::bad_request(
                "Expiration exceeds the longest accepted lifetime",
                json!({ "field": "expiration", "value": expiration_seconds, "max": MAX_EXPIRATION_SECONDS }),
            ));
        }

        Ok(())
    }

    /// Loads a record and checks that `requester_id` owns it.
    async fn owned_link(&self, requester_id: i64, link_id: i64) -> Result<Link, AppError> {
        let link = self
            .repository
            .find_by_id(link_id)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": link_id })))?;

        if !link.is_owned_by(requester_id) {
            return Err(AppError::forbidden(
                "You do not own this link",
                json!({ "id": link_id }),
            ));
        }

        Ok(link)
    }

    /// Creates a link and makes its token resolvable.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for an empty or non-http(s) URL, or an expiration
    ///   outside `1..=MAX_EXPIRATION_SECONDS`
    /// - [`AppError::Internal`] if no free token was found in [`MAX_TOKEN_ATTEMPTS`] tries
    /// - [`AppError::Unavailable`] if either store is unreachable
    pub async fn create_link(
        &self,
        owner_id: i64,
        original_url: String,
        expiration_seconds: i64,
    ) -> Result<Link, AppError> {
        Self::validate(&original_url, expiration_seconds)?;

        let mut created = None;
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let new_link = NewLink {
                token: token_generator::generate(&original_url),
                original_url: original_url.clone(),
                owner_id,
                expiration_seconds,
            };

            match self.repository.create(new_link).await {
                Ok(link) => {
                    created = Some(link);
                    break;
                }
                Err(AppError::Conflict { .. }) => {
                    warn!(attempt, "Token collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        let link = created.ok_or_else(|| {
            AppError::internal(
                "Failed to generate unique token",
                json!({ "reason": "Too many collisions" }),
            )
        })?;

        if let Err(e) = self
            .cache
            .put(&link.token, &link.original_url, link.expiration_seconds)
            .await
        {
            error!(token = %link.token, error = %e, "Cache write failed, removing record");
            if let Err(cleanup) = self.repository.delete(link.id, owner_id).await {
                error!(id = link.id, error = %cleanup, "Failed to remove unresolvable record");
            }
            return Err(e.into());
        }

        info!(id = link.id, token = %link.token, owner_id, "Link created");
        Ok(link)
    }

    /// Resolves `token` to its destination for a request from `client_ip`.
    ///
    /// Only the resolution cache is consulted. On a hit a click event is queued
    /// without waiting; a full queue drops the event.
    ///
    /// # Errors
    ///
    /// - [`AppError::RateLimited`] if `client_ip` exhausted its window; nothing else happens
    /// - [`AppError::NotFound`] if the token is malformed, absent or expired
    pub async fn resolve(&self, token: &str, client_ip: &str) -> Result<String, AppError> {
        if let RateDecision::Rejected { count } = self.limiter.check(client_ip).await? {
            metrics::counter!("redirects_total", "outcome" => "rate_limited").increment(1);
            return Err(AppError::rate_limited(
                "Rate limit exceeded",
                json!({ "limit": self.limiter.limit(), "count": count }),
            ));
        }

        if !token_generator::is_well_formed(token) {
            metrics::counter!("redirects_total", "outcome" => "not_found").increment(1);
            return Err(AppError::not_found("URL not found or expired", json!({})));
        }

        let url = match self.cache.get(token).await {
            Ok(url) => url,
            Err(e) => {
                let err = AppError::from(e);
                let outcome = if matches!(err, AppError::NotFound { .. }) {
                    "not_found"
                } else {
                    "error"
                };
                metrics::counter!("redirects_total", "outcome" => outcome).increment(1);
                return Err(err);
            }
        };

        match self.click_sender.try_send(ClickEvent::new(token, client_ip)) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(token = %event.token, "Click queue full, dropping event");
                metrics::counter!("click_events_dropped_total").increment(1);
            }
            Err(TrySendError::Closed(event)) => {
                warn!(token = %event.token, "Click worker stopped, dropping event");
                metrics::counter!("click_events_dropped_total").increment(1);
            }
        }

        metrics::counter!("redirects_total", "outcome" => "found").increment(1);
        debug!(token, "Resolved");
        Ok(url)
    }

    /// Replaces the destination and lifetime of a link owned by `requester_id`.
    ///
    /// The token never changes. The cache entry is rewritten first, so a failed
    /// record update may leave the new destination live until it expires.
    pub async fn update_link(
        &self,
        requester_id: i64,
        link_id: i64,
        original_url: String,
        expiration_seconds: i64,
    ) -> Result<Link, AppError> {
        Self::validate(&original_url, expiration_seconds)?;

        let link = self.owned_link(requester_id, link_id).await?;

        self.cache
            .put(&link.token, &original_url, expiration_seconds)
            .await?;

        let patch = LinkPatch {
            original_url,
            expiration_seconds,
        };

        let updated = self
            .repository
            .update(link_id, requester_id, patch)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": link_id })))?;

        info!(id = link_id, token = %updated.token, "Link updated");
        Ok(updated)
    }

    /// Deletes a link owned by `requester_id` and evicts its token.
    ///
    /// # Errors
    ///
    /// [`AppError::Unavailable`] if the record is gone but eviction kept failing;
    /// the entry then lives until its TTL runs out.
    pub async fn delete_link(&self, requester_id: i64, link_id: i64) -> Result<(), AppError> {
        let link = self.owned_link(requester_id, link_id).await?;

        if !self.repository.delete(link_id, requester_id).await? {
            return Err(AppError::not_found("Link not found", json!({ "id": link_id })));
        }

        let cache = &self.cache;
        let token = link.token.as_str();
        retry_idempotent(move || async move { cache.delete(token).await.map_err(AppError::from) })
            .await
            .inspect_err(|e| {
                error!(
                    id = link_id,
                    token = %link.token,
                    error = %e,
                    "Record deleted but cache eviction failed"
                );
            })?;

        info!(id = link_id, token = %link.token, "Link deleted");
        Ok(())
    }

    /// Returns a link owned by `requester_id` with its click ledger.
    pub async fn get_link(&self, requester_id: i64, link_id: i64) -> Result<LinkDetails, AppError> {
        let link = self.owned_link(requester_id, link_id).await?;
        let clicks = self.repository.find_clicks(link.id).await?;

        Ok(LinkDetails { link, clicks })
    }

    /// Lists the links of `owner_id`, newest first. `page` starts at 1.
    pub async fn list_links(
        &self,
        owner_id: i64,
        page: i64,
        per_page: i64,
    ) -> Result<LinkPage, AppError> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let offset = (page - 1).saturating_mul(per_page);

        let links = self
            .repository
            .list_by_owner(owner_id, offset, per_page)
            .await?;
        let total = self.repository.count_by_owner(owner_id).await?;

        Ok(LinkPage {
            links,
            total,
            page,
            per_page,
        })
    }

    /// Rewrites the cache entry of every record whose lifetime has not elapsed,
    /// using the remaining lifetime as TTL.
    ///
    /// Converges the cache to the record store after a partial write or a
    /// cache flush. Entries of expired records are left alone. Each write is
    /// followed by a re-read of the record, so links deleted mid-scan are
    /// evicted again rather than resurrected.
    pub async fn reconcile_cache(&self, batch_size: i64) -> Result<ReconcileReport, AppError> {
        let batch_size = batch_size.max(1);
        let mut report = ReconcileReport::default();
        let mut after_id = 0;

        loop {
            let batch = self.repository.list_live(after_id, batch_size).await?;
            let Some(last) = batch.last() else {
                break;
            };
            after_id = last.id;
            let now = Utc::now();

            for link in &batch {
                report.scanned += 1;

                let ttl = link.remaining_ttl(now);
                if ttl == 0 {
                    continue;
                }

                match self.restore_entry(link, ttl).await {
                    Ok(true) => report.rewritten += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(token = %link.token, error = %e, "Failed to rewrite cache entry");
                        report.failed += 1;
                    }
                }
            }

            if (batch.len() as i64) < batch_size {
                break;
            }
        }

        info!(
            scanned = report.scanned,
            rewritten = report.rewritten,
            failed = report.failed,
            "Cache reconciled"
        );
        Ok(report)
    }

    /// Writes the cache entry of `link`, then re-reads the record so a delete
    /// racing with the write does not leave a resolvable orphan behind.
    ///
    /// Returns `false` when the record vanished and the entry was evicted.
    async fn restore_entry(&self, link: &Link, ttl: u64) -> Result<bool, AppError> {
        let ttl = i64::try_from(ttl).unwrap_or(i64::MAX);
        self.cache.put(&link.token, &link.original_url, ttl).await?;

        match self.repository.find_by_id(link.id).await? {
            Some(current) if current.original_url == link.original_url => Ok(true),
            Some(current) => {
                // Updated mid-scan: the fresh record wins.
                let ttl = current.remaining_ttl(Utc::now());
                let ttl = i64::try_from(ttl).unwrap_or(i64::MAX);
                if ttl == 0 {
                    self.cache.delete(&current.token).await?;
                    return Ok(false);
                }
                self.cache.put(&current.token, &current.original_url, ttl).await?;
                Ok(true)
            }
            None => {
                debug!(token = %link.token, "Record deleted during reconcile, evicting");
                self.cache.delete(&link.token).await?;
                Ok(false)
            }
        }
    }
}
