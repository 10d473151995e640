//! API route configuration.
//!
//! All API endpoints require a Bearer session credential via
//! [`crate::api::middleware::auth`].

use crate::api::handlers::{
    create_link_handler, delete_link_handler, get_link_handler, list_links_handler,
    update_link_handler,
};
use crate::state::AppState;
use axum::{Router, routing::get};

/// Link management routes, mounted under `/api`.
///
/// # Endpoints
///
/// - `POST   /url`       - Create a short link
/// - `GET    /url`       - List the caller's links (paginated)
/// - `GET    /url/{id}`  - Link details with click ledger
/// - `PUT    /url/{id}`  - Replace destination and expiration
/// - `DELETE /url/{id}`  - Delete a link and evict its token
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/url", get(list_links_handler).post(create_link_handler))
        .route(
            "/url/{id}",
            get(get_link_handler)
                .put(update_link_handler)
                .delete(delete_link_handler),
        )
}
