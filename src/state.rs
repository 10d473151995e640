//! Shared application state injected into handlers.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::services::{AuthService, LinkService};
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::KeyValueStore;

/// Services and handles shared by every request.
///
/// Cloned per request by axum, so every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub auth_service: Arc<AuthService>,
    /// Backs the resolution cache and the rate limiter; exposed for health checks.
    pub kv_store: Arc<dyn KeyValueStore>,
    /// Record store; exposed for health checks.
    pub repository: Arc<dyn LinkRepository>,
    pub click_sender: mpsc::Sender<ClickEvent>,
    /// Trust `X-Real-IP` / `X-Forwarded-For` when resolving the client IP.
    pub behind_proxy: bool,
}
