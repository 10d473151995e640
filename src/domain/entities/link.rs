//! Link entity: the durable record behind a short token.

use chrono::{DateTime, Duration, Utc};

/// Longest accepted lifetime: ten years.
pub const MAX_EXPIRATION_SECONDS: i64 = 315_360_000;

/// A link record as held by the durable record store.
///
/// `token`, `owner_id` and `created_at` never change after creation.
/// `click_count` is only mutated by the resolution path.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: i64,
    pub token: String,
    pub original_url: String,
    pub owner_id: i64,
    pub expiration_seconds: i64,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// Creates a new Link instance.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i64,
        token: String,
        original_url: String,
        owner_id: i64,
        expiration_seconds: i64,
        click_count: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            token,
            original_url,
            owner_id,
            expiration_seconds,
            click_count,
            created_at,
            updated_at,
        }
    }

    /// Moment the cache entry written for this record lapses.
    ///
    /// The lifetime restarts on every update because the cache entry is rewritten.
    /// Saturates at the latest representable instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Duration::try_seconds(self.expiration_seconds)
            .and_then(|lifetime| self.updated_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Seconds of declared lifetime left at `now`, zero once elapsed.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at() - now).num_seconds().max(0) as u64
    }

    pub fn is_owned_by(&self, owner_id: i64) -> bool {
        self.owner_id == owner_id
    }
}

/// Input data for creating a new link.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub token: String,
    pub original_url: String,
    pub owner_id: i64,
    pub expiration_seconds: i64,
}

/// Replacement of the mutable fields of a link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPatch {
    pub original_url: String,
    pub expiration_seconds: i64,
}
