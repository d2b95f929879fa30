//! Core infrastructure for the Vízállás push notification service.
//!
//! Holds the shared application state handed to every HTTP handler and the
//! middleware that guards the public endpoints.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod app;
pub mod cors;
pub mod prelude;

pub use app::{App, AppOpts, AppState, VapidConfig};
pub use cors::CorsPolicy;

// vim: ts=4
