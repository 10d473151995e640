//! DTOs for the health check endpoint.

use serde::Serialize;

/// Outcome of one component probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Ok,
    Error,
}

/// Health of a single component.
#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub status: ProbeStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Ok,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }
}

/// Probes of the record store, key-value store and click queue.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: CheckStatus,
    pub cache: CheckStatus,
    pub click_queue: CheckStatus,
}

impl HealthChecks {
    pub fn all_ok(&self) -> bool {
        self.database.is_ok() && self.cache.is_ok() && self.click_queue.is_ok()
    }
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

impl HealthResponse {
    pub fn new(checks: HealthChecks) -> Self {
        Self {
            status: if checks.all_ok() { "healthy" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            checks,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.checks.all_ok()
    }
}
