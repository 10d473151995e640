//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence and caching.
//!
//! # Modules
//!
//! - [`cache`] - Key-value stores (Redis and in-process) and the resolution cache
//! - [`persistence`] - PostgreSQL and in-memory record stores

pub mod cache;
pub mod persistence;
