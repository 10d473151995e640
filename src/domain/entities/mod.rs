//! Core domain entities.
//!
//! - [`Link`] - The durable record behind a token
//! - [`Click`] - An entry of a link's click ledger
//!
//! Creation and mutation inputs are separate types: [`NewLink`], [`LinkPatch`],
//! [`NewClick`].

pub mod click;
pub mod link;

pub use click::{Click, NewClick};
pub use link::{Link, LinkPatch, MAX_EXPIRATION_SECONDS, NewLink};
