//! Repository trait for the durable link record store.

use crate::domain::entities::{Click, Link, LinkPatch, NewClick, NewLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Durable record store for links and their click ledgers.
///
/// Source of truth for ownership, metadata and analytics. Never consulted on the
/// redirect path except to record clicks.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Persists a new link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the token is already taken.
    /// Returns [`AppError::Internal`] or [`AppError::Unavailable`] on store errors.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds a link by its record id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError>;

    /// Returns the click ledger of a link, oldest first.
    async fn find_clicks(&self, link_id: i64) -> Result<Vec<Click>, AppError>;

    /// Replaces the mutable fields and bumps `updated_at`.
    ///
    /// Returns `Ok(None)` if no record matches `id` and `owner_id`.
    async fn update(
        &self,
        id: i64,
        owner_id: i64,
        patch: LinkPatch,
    ) -> Result<Option<Link>, AppError>;

    /// Deletes a link together with its ledger.
    ///
    /// Returns `Ok(false)` if no record matches `id` and `owner_id`.
    async fn delete(&self, id: i64, owner_id: i64) -> Result<bool, AppError>;

    /// Atomically increments `click_count` and appends to the ledger of the
    /// record owning `click.token`.
    ///
    /// Returns `Ok(false)` if no record holds the token.
    async fn record_click(&self, click: NewClick) -> Result<bool, AppError>;

    /// Lists links of one owner, newest first.
    async fn list_by_owner(
        &self,
        owner_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Link>, AppError>;

    /// Counts links of one owner.
    async fn count_by_owner(&self, owner_id: i64) -> Result<i64, AppError>;

    /// Lists links whose declared lifetime has not elapsed, ordered by id,
    /// starting after `after_id`.
    async fn list_live(&self, after_id: i64, limit: i64) -> Result<Vec<Link>, AppError>;

    /// Checks that the store answers queries.
    async fn health_check(&self) -> bool;
}
