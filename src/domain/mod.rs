//! Domain layer containing business entities and the record-store port.
//!
//! - [`entities`] - Core data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click tracking event model
//! - [`click_worker`] - Asynchronous click processing worker
//!
//! # Click Processing Flow
//!
//! 1. The resolution path hits the cache and issues the redirect
//! 2. A [`click_event::ClickEvent`] is pushed to a bounded channel (non-blocking)
//! 3. [`click_worker::run_click_worker`] persists it through
//!    [`repositories::LinkRepository::record_click`]

pub mod click_event;
pub mod click_worker;
pub mod entities;
pub mod repositories;
