//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::{Click, Link, LinkPatch, NewClick, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::io::{retry_idempotent, with_deadline};

const LINK_COLUMNS: &str = "id, token, original_url, owner_id, expiration_seconds, click_count, created_at, updated_at";

#[derive(FromRow)]
struct LinkRow {
    id: i64,
    token: String,
    original_url: String,
    owner_id: i64,
    expiration_seconds: i64,
    click_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        Link::new(
            r.id,
            r.token,
            r.original_url,
            r.owner_id,
            r.expiration_seconds,
            r.click_count,
            r.created_at,
            r.updated_at,
        )
    }
}

#[derive(FromRow)]
struct ClickRow {
    ip_address: String,
    clicked_at: DateTime<Utc>,
}

/// PostgreSQL repository for link records and click ledgers.
///
/// Every call runs under `timeout`. Reads are retried on transient failures,
/// writes are not.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn fetch_link(&self, id: i64) -> Result<Option<Link>, AppError> {
        let sql = format!("SELECT {} FROM links WHERE id = $1", LINK_COLUMNS);

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Link::from))
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let sql = format!(
            "INSERT INTO links (token, original_url, owner_id, expiration_seconds) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            LINK_COLUMNS
        );

        with_deadline(self.timeout, "links.create", async {
            let row = sqlx::query_as::<_, LinkRow>(&sql)
                .bind(&new_link.token)
                .bind(&new_link.original_url)
                .bind(new_link.owner_id)
                .bind(new_link.expiration_seconds)
                .fetch_one(self.pool.as_ref())
                .await?;
            Ok::<_, AppError>(row.into())
        })
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        retry_idempotent(move || with_deadline(self.timeout, "links.find_by_id", self.fetch_link(id)))
            .await
    }

    async fn find_clicks(&self, link_id: i64) -> Result<Vec<Click>, AppError> {
        retry_idempotent(move || {
            with_deadline(self.timeout, "link_clicks.find", async move {
                let rows = sqlx::query_as::<_, ClickRow>(
                    r#"
                    SELECT ip_address, clicked_at
                    FROM link_clicks
                    WHERE link_id = $1
                    ORDER BY clicked_at, id
                    "#,
                )
                .bind(link_id)
                .fetch_all(self.pool.as_ref())
                .await?;

                Ok::<_, AppError>(rows
                    .into_iter()
                    .map(|r| Click::new(r.ip_address, r.clicked_at))
                    .collect())
            })
        })
        .await
    }

    async fn update(
        &self,
        id: i64,
        owner_id: i64,
        patch: LinkPatch,
    ) -> Result<Option<Link>, AppError> {
        let sql = format!(
            "UPDATE links \
             SET original_url = $3, expiration_seconds = $4, updated_at = now() \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING {}",
            LINK_COLUMNS
        );

        with_deadline(self.timeout, "links.update", async {
            let row = sqlx::query_as::<_, LinkRow>(&sql)
                .bind(id)
                .bind(owner_id)
                .bind(&patch.original_url)
                .bind(patch.expiration_seconds)
                .fetch_optional(self.pool.as_ref())
                .await?;
            Ok::<_, AppError>(row.map(Link::from))
        })
        .await
    }

    async fn delete(&self, id: i64, owner_id: i64) -> Result<bool, AppError> {
        with_deadline(self.timeout, "links.delete", async {
            let result = sqlx::query("DELETE FROM links WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(owner_id)
                .execute(self.pool.as_ref())
                .await?;
            Ok::<_, AppError>(result.rows_affected() > 0)
        })
        .await
    }

    async fn record_click(&self, click: NewClick) -> Result<bool, AppError> {
        with_deadline(self.timeout, "link_clicks.record", async {
            let result = sqlx::query(
                r#"
                WITH bumped AS (
                    UPDATE links
                    SET click_count = click_count + 1
                    WHERE token = $1
                    RETURNING id
                )
                INSERT INTO link_clicks (link_id, ip_address, clicked_at)
                SELECT id, $2, $3 FROM bumped
                "#,
            )
            .bind(&click.token)
            .bind(&click.ip_address)
            .bind(click.clicked_at)
            .execute(self.pool.as_ref())
            .await?;
            Ok::<_, AppError>(result.rows_affected() > 0)
        })
        .await
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Link>, AppError> {
        let sql = format!(
            "SELECT {} FROM links WHERE owner_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            LINK_COLUMNS
        );
        let sql = sql.as_str();

        retry_idempotent(move || {
            with_deadline(self.timeout, "links.list_by_owner", async move {
                let rows = sqlx::query_as::<_, LinkRow>(sql)
                    .bind(owner_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.pool.as_ref())
                    .await?;
                Ok::<_, AppError>(rows.into_iter().map(Link::from).collect())
            })
        })
        .await
    }

    async fn count_by_owner(&self, owner_id: i64) -> Result<i64, AppError> {
        retry_idempotent(move || {
            with_deadline(self.timeout, "links.count_by_owner", async move {
                let count: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE owner_id = $1")
                        .bind(owner_id)
                        .fetch_one(self.pool.as_ref())
                        .await?;
                Ok::<_, AppError>(count)
            })
        })
        .await
    }

    async fn list_live(&self, after_id: i64, limit: i64) -> Result<Vec<Link>, AppError> {
        let sql = format!(
            "SELECT {} FROM links \
             WHERE id > $1 AND updated_at + expiration_seconds * INTERVAL '1 second' > now() \
             ORDER BY id LIMIT $2",
            LINK_COLUMNS
        );
        let sql = sql.as_str();

        retry_idempotent(move || {
            with_deadline(self.timeout, "links.list_live", async move {
                let rows = sqlx::query_as::<_, LinkRow>(sql)
                    .bind(after_id)
                    .bind(limit)
                    .fetch_all(self.pool.as_ref())
                    .await?;
                Ok::<_, AppError>(rows.into_iter().map(Link::from).collect())
            })
        })
        .await
    }

    async fn health_check(&self) -> bool {
        let check = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(self.pool.as_ref());

        matches!(tokio::time::timeout(self.timeout, check).await, Ok(Ok(_)))
    }
}
