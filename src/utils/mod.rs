//! Utility functions for token generation, request inspection and I/O discipline.
//!
//! - [`token_generator`] - Short token derivation and shape checks
//! - [`client_ip`] - Client IP extraction (proxy-aware)
//! - [`io`] - Deadlines and retries around store calls
//! - [`db_error`] - PostgreSQL error classification

pub mod client_ip;
pub mod db_error;
pub mod io;
pub mod token_generator;
