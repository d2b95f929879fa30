//! Push notification HTTP handlers

use axum::{
	Json,
	body::Bytes,
	extract::State,
	response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::ece::SubscriberKeys;
use crate::fanout::FanoutController;
use crate::prelude::*;
use crate::validate::{NotificationRequest, ValidationFailure, Violation};
use crate::vapid::VapidSigner;
use vizallas_types::subscription_adapter::{CreateSubscriptionData, NotificationPrefs};
use vizallas_types::utils::b64url_encode;

/// Response of a processed send request
#[derive(Debug, Serialize)]
pub struct SendResponse {
	pub message: String,
	pub total: usize,
	pub sent: usize,
	pub failed: usize,
}

/// POST /send-push-notification
///
/// Validates the request, then delivers it to the targeted subscriptions.
/// Per-subscription failures are counted, never returned as an error.
pub async fn post_send_notification(State(app): State<App>, body: Bytes) -> Response {
	let value: serde_json::Value = match serde_json::from_slice(&body) {
		Ok(value) => value,
		Err(_) => {
			return ValidationFailure(vec![Violation {
				field: "request",
				message: "must be valid JSON".into(),
			}])
			.into_response();
		}
	};
	let request = match NotificationRequest::parse(&value) {
		Ok(request) => request,
		Err(failure) => return failure.into_response(),
	};

	let summary = match FanoutController::from_app(&app) {
		Ok(controller) => controller.send(&request).await,
		Err(err) => Err(err),
	};
	match summary {
		Ok(summary) => {
			let message = if summary.total == 0 {
				"No subscriptions to notify".to_string()
			} else {
				format!("Sent {} of {} notifications", summary.sent, summary.total)
			};
			Json(SendResponse {
				message,
				total: summary.total,
				sent: summary.sent,
				failed: summary.failed,
			})
			.into_response()
		}
		Err(err) => err.into_response(),
	}
}

/// Browser `PushSubscription.toJSON()` keys
#[derive(Debug, Deserialize)]
pub struct SubscriptionKeys {
	pub p256dh: String,
	pub auth: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
	pub endpoint: String,
	pub keys: SubscriptionKeys,
	/// Category opt-ins, missing flags take their defaults
	#[serde(default)]
	pub categories: NotificationPrefs,
}

fn validate_endpoint(endpoint: &str) -> ClResult<()> {
	let url = url::Url::parse(endpoint)
		.map_err(|_| Error::ValidationError("endpoint is not a URL".into()))?;
	if url.scheme() != "https" || url.host_str().is_none() {
		return Err(Error::ValidationError("endpoint must be an https URL".into()));
	}
	Ok(())
}

/// POST /push-subscription
///
/// Registers a browser push subscription. Keys are checked before storing,
/// so only deliverable key material reaches the store.
pub async fn post_subscription(
	State(app): State<App>,
	body: Bytes,
) -> ClResult<Json<serde_json::Value>> {
	let req: CreateSubscriptionRequest = serde_json::from_slice(&body)?;

	validate_endpoint(&req.endpoint)?;
	let keys = SubscriberKeys::from_base64(&req.keys.p256dh, &req.keys.auth)
		.map_err(|err| Error::ValidationError(err.to_string()))?;
	let auth = vizallas_types::utils::b64url_decode(&req.keys.auth)?;

	let data = CreateSubscriptionData {
		endpoint: req.endpoint.into(),
		p256dh: b64url_encode(keys.public_key_bytes()).into(),
		auth: b64url_encode(auth).into(),
		prefs: req.categories,
	};
	let id = app.subscription_adapter.create_subscription(&data).await?;
	info!(subscription_id = %id, "Push subscription registered");

	Ok(Json(serde_json::json!({ "id": id })))
}

/// GET /vapid-public-key
///
/// The `applicationServerKey` browsers subscribe with.
pub async fn get_vapid_public_key(State(app): State<App>) -> ClResult<Json<serde_json::Value>> {
	let vapid = app
		.opts
		.vapid
		.as_ref()
		.ok_or_else(|| Error::ConfigError("VAPID keys are not configured".into()))?;
	let signer = VapidSigner::new(vapid)?;

	Ok(Json(serde_json::json!({ "vapidPublicKey": signer.public_key() })))
}


// vim: ts=4
