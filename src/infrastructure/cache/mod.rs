//! Key-value layer for redirect lookups and rate-limit counters.
//!
//! Provides a [`KeyValueStore`] trait with two implementations:
//! - [`RedisStore`] - Production Redis-backed store
//! - [`MemoryStore`] - In-process store for single-instance runs and tests
//!
//! [`ResolutionCache`] sits on top of either one.

mod memory_cache;
mod redis_cache;
mod resolution_cache;
mod service;
#[cfg(test)]
pub mod testing;

pub use memory_cache::MemoryStore;
pub use redis_cache::RedisStore;
pub use resolution_cache::ResolutionCache;
pub use service::{CacheError, CacheResult, KeyValueStore};
