//! Adapter that stores push subscriptions and their delivery state.
//!
//! The store is owned by the deployment; this service only reads enabled
//! subscriptions and performs the state transitions that follow a delivery
//! attempt. Key material (`p256dh`, `auth`) is immutable: a changed
//! endpoint or key pair is registered as a new subscription.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;

/// Notification topics a subscriber can opt into
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationCategory {
	#[default]
	WaterLevel,
	Drought,
	Weather,
}

impl NotificationCategory {
	pub const ALL: [NotificationCategory; 3] =
		[NotificationCategory::WaterLevel, NotificationCategory::Drought, NotificationCategory::Weather];

	pub fn as_str(self) -> &'static str {
		match self {
			NotificationCategory::WaterLevel => "waterLevel",
			NotificationCategory::Drought => "drought",
			NotificationCategory::Weather => "weather",
		}
	}

	pub fn parse(s: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|c| c.as_str() == s)
	}
}

/// Per-category opt-in flags of a subscription
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPrefs {
	pub water_level: bool,
	pub drought: bool,
	pub weather: bool,
}

impl NotificationPrefs {
	pub fn allows(&self, category: NotificationCategory) -> bool {
		match category {
			NotificationCategory::WaterLevel => self.water_level,
			NotificationCategory::Drought => self.drought,
			NotificationCategory::Weather => self.weather,
		}
	}
}

impl Default for NotificationPrefs {
	fn default() -> Self {
		Self { water_level: true, drought: false, weather: false }
	}
}

/// A stored push subscription
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
	pub id: Box<str>,
	/// Push service URL
	pub endpoint: Box<str>,
	/// base64url 65-byte uncompressed P-256 point
	pub p256dh: Box<str>,
	/// base64url 16-byte authentication secret
	#[serde(skip_serializing)]
	pub auth: Box<str>,
	pub enabled: bool,
	pub prefs: NotificationPrefs,
	pub last_success_at: Option<Timestamp>,
	pub last_failure_at: Option<Timestamp>,
	pub last_failure_reason: Option<Box<str>>,
	pub failure_count: u32,
	pub created_at: Timestamp,
}

/// Data for registering a new subscription
#[derive(Clone, Debug)]
pub struct CreateSubscriptionData {
	pub endpoint: Box<str>,
	pub p256dh: Box<str>,
	pub auth: Box<str>,
	pub prefs: NotificationPrefs,
}

/// Options for selecting delivery targets. Only enabled subscriptions are
/// ever returned.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListSubscriptionOptions<'a> {
	/// Restrict to these ids
	pub ids: Option<&'a [Box<str>]>,
	/// Restrict to subscribers opted into this category
	pub category: Option<NotificationCategory>,
}

impl ListSubscriptionOptions<'_> {
	/// Check whether a subscription matches these options
	pub fn matches(&self, subscription: &Subscription) -> bool {
		subscription.enabled
			&& self.ids.is_none_or(|ids| ids.iter().any(|id| *id == subscription.id))
			&& self.category.is_none_or(|category| subscription.prefs.allows(category))
	}
}

#[async_trait]
pub trait SubscriptionAdapter: Debug + Send + Sync {
	/// Lists enabled subscriptions matching the options
	async fn list_subscriptions(
		&self,
		opts: &ListSubscriptionOptions<'_>,
	) -> ClResult<Vec<Subscription>>;

	/// Reads one subscription (enabled or not)
	async fn read_subscription(&self, id: &str) -> ClResult<Subscription>;

	/// Registers a subscription, always issuing a fresh id
	async fn create_subscription(&self, data: &CreateSubscriptionData) -> ClResult<Box<str>>;

	/// Records a successful delivery
	async fn mark_success(&self, id: &str) -> ClResult<()>;

	/// Records a failed delivery with its reason
	async fn mark_failure(&self, id: &str, reason: &str) -> ClResult<()>;

	/// Sets `enabled = false`; the subscription is never dispatched to again
	async fn disable_subscription(&self, id: &str) -> ClResult<()>;
}


// vim: ts=4
