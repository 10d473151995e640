//! Handler for the health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Probes the record store, the key-value store and the click queue.
///
/// `GET /health` → `200 OK` when every probe passes, `503 Service Unavailable`
/// otherwise. Both carry the same body:
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected" },
///     "cache": { "status": "ok", "message": "Connected" },
///     "click_queue": { "status": "ok", "message": "Capacity: 10000" }
///   }
/// }
/// ```
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (database, cache) = tokio::join!(
        state.repository.health_check(),
        state.kv_store.health_check()
    );

    let click_queue = if state.click_sender.is_closed() {
        CheckStatus::error("Click queue is closed")
    } else {
        CheckStatus::ok(format!("Capacity: {}", state.click_sender.capacity()))
    };

    let response = HealthResponse::new(HealthChecks {
        database: probe(database, "Record store unreachable"),
        cache: probe(cache, "Key-value store unreachable"),
        click_queue,
    });

    let status = if response.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

fn probe(healthy: bool, failure: &str) -> CheckStatus {
    if healthy {
        CheckStatus::ok("Connected")
    } else {
        CheckStatus::error(failure)
    }
}
