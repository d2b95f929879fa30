//! App state type

use std::{sync::Arc, time::Duration};

use crate::cors::CorsPolicy;
use vizallas_types::push_transport::PushTransport;
use vizallas_types::subscription_adapter::SubscriptionAdapter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seconds a push service keeps an undelivered message
pub const DEFAULT_PUSH_TTL: u32 = 86400;
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PUSH_CONCURRENCY: usize = 100;

/// VAPID sender identity as found in the deployment environment
#[derive(Clone)]
pub struct VapidConfig {
	/// base64url 65-byte uncompressed P-256 point
	pub public_key: Box<str>,
	/// base64url 32-byte P-256 scalar
	pub private_key: Box<str>,
	/// Contact URI (`mailto:` or `https:`)
	pub subject: Box<str>,
}

impl std::fmt::Debug for VapidConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VapidConfig")
			.field("public_key", &self.public_key)
			.field("private_key", &"<redacted>")
			.field("subject", &self.subject)
			.finish()
	}
}

#[derive(Debug, Clone)]
pub struct AppOpts {
	pub listen: Box<str>,
	pub cors: CorsPolicy,
	/// `None` when either key is missing: every send request then fails
	/// with a configuration error
	pub vapid: Option<VapidConfig>,
	pub push_ttl: u32,
	pub push_timeout: Duration,
	pub push_concurrency: usize,
}

impl Default for AppOpts {
	fn default() -> Self {
		Self {
			listen: "127.0.0.1:8080".into(),
			cors: CorsPolicy::default(),
			vapid: None,
			push_ttl: DEFAULT_PUSH_TTL,
			push_timeout: DEFAULT_PUSH_TIMEOUT,
			push_concurrency: DEFAULT_PUSH_CONCURRENCY,
		}
	}
}

pub struct AppState {
	pub opts: AppOpts,
	pub subscription_adapter: Arc<dyn SubscriptionAdapter>,
	pub push_transport: Arc<dyn PushTransport>,
}

impl std::fmt::Debug for AppState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AppState").field("opts", &self.opts).finish_non_exhaustive()
	}
}

pub type App = Arc<AppState>;


// vim: ts=4
