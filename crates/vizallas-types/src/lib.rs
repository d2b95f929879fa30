//! Shared types, adapter traits, and core utilities for the Vízállás push
//! notification service.
//!
//! This crate contains the foundational types that are shared between the
//! application crate, the push delivery crate and all adapter
//! implementations.

pub mod error;
pub mod prelude;
pub mod push_transport;
pub mod subscription_adapter;
pub mod types;
pub mod utils;

// vim: ts=4
