//! Record store implementations.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - PostgreSQL link records and click ledgers
//! - [`MemoryLinkRepository`] - In-process implementation used by tests and local runs

pub mod memory_link_repository;
pub mod pg_link_repository;

pub use memory_link_repository::MemoryLinkRepository;
pub use pg_link_repository::PgLinkRepository;
