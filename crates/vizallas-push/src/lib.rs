//! Web Push delivery
//!
//! Implements the sending side of Web Push without a push library:
//!
//! - VAPID sender authentication (RFC 8292)
//! - Message encryption, `aes128gcm` content coding (RFC 8188, 8291)
//! - Delivery and response classification (RFC 8030)
//! - Concurrent fan-out with per-subscription outcome tracking
//! - Validation of notification requests
//!
//! Control flow of one send request:
//! `validate` → `fanout` → {`vapid`, `ece`} → `dispatch` → subscription store

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod client;
pub mod dispatch;
pub mod ece;
pub mod fanout;
pub mod handler;
pub mod validate;
pub mod vapid;

mod prelude;

pub use client::HyperPushTransport;
pub use dispatch::{DeliveryOutcome, Dispatcher};
pub use fanout::{FanoutController, FanoutSummary};
pub use validate::{NotificationPayload, NotificationRequest};
pub use vapid::{VapidSigner, generate_keypair};

// vim: ts=4
