//! Concurrent delivery of one notification to a set of subscriptions
//!
//! Every subscription is delivered to in its own task. A task's error (or
//! panic) becomes a `Failure` outcome for that subscription only, siblings
//! are never cancelled. Each task records its outcome in the subscription
//! store itself, so the bookkeeping completes even when the caller goes away
//! mid-flight.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::dispatch::{DeliveryOutcome, Dispatcher};
use crate::ece::SubscriberKeys;
use crate::prelude::*;
use crate::validate::NotificationRequest;
use crate::vapid::VapidSigner;
use vizallas_types::push_transport::PushTransport;
use vizallas_types::subscription_adapter::{
	ListSubscriptionOptions, Subscription, SubscriptionAdapter,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFailure {
	pub subscription_id: Box<str>,
	pub reason: String,
}

/// Aggregate result of a fan-out
#[derive(Debug, Clone, Default, Serialize)]
pub struct FanoutSummary {
	pub total: usize,
	pub sent: usize,
	pub failed: usize,
	#[serde(skip)]
	pub failures: Vec<DeliveryFailure>,
}

#[derive(Debug, Clone)]
pub struct FanoutController {
	adapter: Arc<dyn SubscriptionAdapter>,
	signer: Arc<VapidSigner>,
	dispatcher: Dispatcher,
	concurrency: usize,
}

impl FanoutController {
	pub fn new(
		adapter: Arc<dyn SubscriptionAdapter>,
		transport: Arc<dyn PushTransport>,
		signer: VapidSigner,
		ttl: u32,
		timeout: Duration,
		concurrency: usize,
	) -> Self {
		Self {
			adapter,
			signer: Arc::new(signer),
			dispatcher: Dispatcher::new(transport, ttl, timeout),
			concurrency: concurrency.max(1),
		}
	}

	/// Builds a controller from the application state.
	///
	/// Fails with `ConfigError` when VAPID keys are missing or invalid.
	pub fn from_app(app: &App) -> ClResult<Self> {
		let vapid = app
			.opts
			.vapid
			.as_ref()
			.ok_or_else(|| Error::ConfigError("VAPID keys are not configured".into()))?;
		let signer = VapidSigner::new(vapid)?;

		Ok(Self::new(
			app.subscription_adapter.clone(),
			app.push_transport.clone(),
			signer,
			app.opts.push_ttl,
			app.opts.push_timeout,
			app.opts.push_concurrency,
		))
	}

	pub async fn send(&self, request: &NotificationRequest) -> ClResult<FanoutSummary> {
		let payload: Arc<[u8]> = request.payload_bytes()?.into();

		let opts = match request.subscription_ids.as_deref() {
			Some(ids) => ListSubscriptionOptions { ids: Some(ids), category: None },
			None => ListSubscriptionOptions { ids: None, category: Some(request.category) },
		};
		let subscriptions = self.adapter.list_subscriptions(&opts).await?;

		let mut summary = FanoutSummary { total: subscriptions.len(), ..Default::default() };
		if subscriptions.is_empty() {
			info!("No subscriptions to notify");
			return Ok(summary);
		}
		info!(total = summary.total, "Sending push notification");

		let semaphore = Arc::new(Semaphore::new(self.concurrency));
		let mut tasks = Vec::with_capacity(subscriptions.len());
		for subscription in subscriptions {
			let id = subscription.id.clone();
			let adapter = self.adapter.clone();
			let signer = self.signer.clone();
			let dispatcher = self.dispatcher.clone();
			let payload = payload.clone();
			let semaphore = semaphore.clone();

			let task_id = id.clone();
			let handle = tokio::spawn(async move {
				let outcome = match semaphore.acquire_owned().await {
					Ok(_permit) => {
						// A panic while delivering only fails the inner task
						let delivery = tokio::spawn(async move {
							deliver_one(&signer, &dispatcher, &subscription, &payload).await
						});
						match delivery.await {
							Ok(outcome) => outcome,
							Err(err) => {
								error!(subscription_id = %task_id, error = %err, "Delivery task failed");
								DeliveryOutcome::Failure("delivery task failed".into())
							}
						}
					}
					Err(_) => DeliveryOutcome::Failure("delivery cancelled".into()),
				};
				record_outcome(adapter.as_ref(), &task_id, &outcome).await;
				outcome
			});
			tasks.push((id, handle));
		}

		for (id, handle) in tasks {
			let outcome = match handle.await {
				Ok(outcome) => outcome,
				Err(err) => {
					error!(subscription_id = %id, error = %err, "Delivery task failed");
					DeliveryOutcome::Failure("delivery task failed".into())
				}
			};

			match outcome.reason() {
				None => summary.sent += 1,
				Some(reason) => {
					summary.failed += 1;
					summary.failures.push(DeliveryFailure {
						subscription_id: id,
						reason: reason.to_string(),
					});
				}
			}
		}

		info!(
			total = summary.total,
			sent = summary.sent,
			failed = summary.failed,
			"Push notification fan-out finished"
		);
		Ok(summary)
	}
}

/// Applies the state transition an outcome calls for. Store errors are
/// logged only: the delivery itself already happened.
async fn record_outcome(adapter: &dyn SubscriptionAdapter, id: &str, outcome: &DeliveryOutcome) {
	let res = match outcome {
		DeliveryOutcome::Success => {
			debug!(subscription_id = %id, "Push notification delivered");
			adapter.mark_success(id).await
		}
		DeliveryOutcome::Expired => {
			info!(subscription_id = %id, "Subscription expired, disabling");
			if let Err(err) = adapter.disable_subscription(id).await {
				warn!(subscription_id = %id, error = %err, "Failed to disable subscription");
			}
			adapter.mark_failure(id, outcome.reason().unwrap_or_default()).await
		}
		DeliveryOutcome::Failure(reason) => {
			warn!(subscription_id = %id, reason = %reason, "Push notification failed");
			adapter.mark_failure(id, reason).await
		}
	};
	if let Err(err) = res {
		warn!(subscription_id = %id, error = %err, "Failed to record delivery outcome");
	}
}

/// Errors outside the per-subscription taxonomy point at the service itself
fn delivery_failed(id: &str, err: Error) -> DeliveryOutcome {
	if !err.is_per_subscription() {
		error!(subscription_id = %id, error = %err, "Delivery aborted by a service error");
	}
	err.into()
}

async fn deliver_one(
	signer: &VapidSigner,
	dispatcher: &Dispatcher,
	subscription: &Subscription,
	payload: &[u8],
) -> DeliveryOutcome {
	let keys = match SubscriberKeys::from_base64(&subscription.p256dh, &subscription.auth) {
		Ok(keys) => keys,
		Err(err) => return delivery_failed(&subscription.id, err),
	};
	let vapid = match signer.sign(&subscription.endpoint) {
		Ok(vapid) => vapid,
		Err(err) => return delivery_failed(&subscription.id, err),
	};
	dispatcher.encrypt_and_deliver(&subscription.endpoint, &keys, &vapid, payload).await
}


// vim: ts=4
