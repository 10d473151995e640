//! Application layer services implementing business logic.
//!
//! Services consume the repository and key-value traits and expose the
//! operations HTTP handlers and the admin CLI call.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Link lifecycle and token resolution
//! - [`services::rate_limiter::RateLimiter`] - Fixed-window limiter for the redirect path
//! - [`services::auth_service::AuthService`] - Session credential issuing and verification

pub mod services;
