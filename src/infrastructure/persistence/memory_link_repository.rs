//! In-process implementation of link repository.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::entities::{Click, Link, LinkPatch, NewClick, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

#[derive(Default)]
struct Tables {
    next_id: i64,
    links: BTreeMap<i64, Link>,
    clicks: BTreeMap<i64, Vec<Click>>,
}

/// Link records held in process memory.
///
/// Enforces the same token uniqueness as the PostgreSQL schema. Contents are
/// lost on restart.
#[derive(Default)]
pub struct MemoryLinkRepository {
    tables: Mutex<Tables>,
}

impl MemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::internal("Record store lock poisoned", json!({})))
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let mut tables = self.lock()?;

        if tables.links.values().any(|l| l.token == new_link.token) {
            return Err(AppError::conflict("Token already exists", json!({})));
        }

        tables.next_id += 1;
        let now = Utc::now();
        let link = Link::new(
            tables.next_id,
            new_link.token,
            new_link.original_url,
            new_link.owner_id,
            new_link.expiration_seconds,
            0,
            now,
            now,
        );

        tables.links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        Ok(self.lock()?.links.get(&id).cloned())
    }

    async fn find_clicks(&self, link_id: i64) -> Result<Vec<Click>, AppError> {
        Ok(self
            .lock()?
            .clicks
            .get(&link_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update(
        &self,
        id: i64,
        owner_id: i64,
        patch: LinkPatch,
    ) -> Result<Option<Link>, AppError> {
        let mut tables = self.lock()?;

        let Some(link) = tables
            .links
            .get_mut(&id)
            .filter(|l| l.is_owned_by(owner_id))
        else {
            return Ok(None);
        };

        link.original_url = patch.original_url;
        link.expiration_seconds = patch.expiration_seconds;
        link.updated_at = Utc::now();

        Ok(Some(link.clone()))
    }

    async fn delete(&self, id: i64, owner_id: i64) -> Result<bool, AppError> {
        let mut tables = self.lock()?;

        if !tables.links.get(&id).is_some_and(|l| l.is_owned_by(owner_id)) {
            return Ok(false);
        }

        tables.links.remove(&id);
        tables.clicks.remove(&id);
        Ok(true)
    }

    async fn record_click(&self, click: NewClick) -> Result<bool, AppError> {
        let mut tables = self.lock()?;

        let Some(link) = tables.links.values_mut().find(|l| l.token == click.token) else {
            return Ok(false);
        };

        link.click_count += 1;
        let id = link.id;

        tables
            .clicks
            .entry(id)
            .or_default()
            .push(Click::new(click.ip_address, click.clicked_at));
        Ok(true)
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Link>, AppError> {
        let tables = self.lock()?;

        // Ids grow with creation time, so reverse id order is newest first.
        Ok(tables
            .links
            .values()
            .rev()
            .filter(|l| l.is_owned_by(owner_id))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_by_owner(&self, owner_id: i64) -> Result<i64, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .links
            .values()
            .filter(|l| l.is_owned_by(owner_id))
            .count() as i64)
    }

    async fn list_live(&self, after_id: i64, limit: i64) -> Result<Vec<Link>, AppError> {
        let tables = self.lock()?;
        let now = Utc::now();

        Ok(tables
            .links
            .range(after_id.saturating_add(1)..)
            .map(|(_, l)| l)
            .filter(|l| l.expires_at() > now)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> bool {
        self.lock().is_ok()
    }
}
