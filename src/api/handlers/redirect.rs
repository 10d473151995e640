//! Handler for short link resolution.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Redirects a short token to its destination.
///
/// # Endpoint
///
/// `GET /{token}`
///
/// # Request Flow
///
/// 1. Resolve the client IP (peer address, or proxy headers when `BEHIND_PROXY`)
/// 2. Count the request against the client's rate-limit window
/// 3. Look the token up in the resolution cache; the record store is never consulted
/// 4. Queue a click event for the background worker
/// 5. Return `302 Found` with `Location`
///
/// # Errors
///
/// - 429 Too Many Requests when the client exhausted its window
/// - 404 Not Found for unknown, expired or malformed tokens
pub async fn redirect_handler(
    Path(token): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Response, AppError> {
    let ip = client_ip(&headers, addr, state.behind_proxy);

    let url = state.link_service.resolve(&token, &ip).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}
