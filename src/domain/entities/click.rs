//! Click ledger entries.

use chrono::{DateTime, Utc};

/// One resolution event in a link's append-only click ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Click {
    pub ip_address: String,
    pub clicked_at: DateTime<Utc>,
}

impl Click {
    pub fn new(ip_address: String, clicked_at: DateTime<Utc>) -> Self {
        Self {
            ip_address,
            clicked_at,
        }
    }
}

/// Input data for recording a click against the record owning `token`.
///
/// Recording increments `click_count` and appends to the ledger in one step.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClick {
    pub token: String,
    pub ip_address: String,
    pub clicked_at: DateTime<Utc>,
}
