//! Vízállás is a Web Push alert service for Hungarian water level, drought
//! and weather warnings.
//!
//! # Features
//!
//! - Web Push from primitives: VAPID, `aes128gcm` payload encryption
//! - Concurrent fan-out with per-subscription outcome tracking
//! - Category opt-ins (water level, drought, weather)
//! - Origin allow-list for browser callers
//! - Pluggable subscription store (SQLite adapter included)

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

// Re-export shared types and adapter traits from vizallas-types
pub use vizallas_types::error;
pub use vizallas_types::push_transport;
pub use vizallas_types::subscription_adapter;
pub use vizallas_types::types;
pub use vizallas_types::utils;

// Feature crate re-exports
pub use vizallas_push as push;

// Local modules
pub mod app;
pub mod config;
pub mod prelude;
pub mod routes;

pub use crate::app::{App, AppBuilder};
pub use crate::config::Config;

// vim: ts=4
