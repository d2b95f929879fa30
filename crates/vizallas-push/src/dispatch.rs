//! Delivery to push services (RFC 8030)

use std::{sync::Arc, time::Duration};

use crate::ece::{self, CONTENT_ENCODING, CONTENT_TYPE, EncryptedRecord};
use crate::prelude::*;
use crate::vapid::VapidHeaders;
use vizallas_types::push_transport::{PushRequest, PushResponse, PushTransport};

/// Longest push service response body kept as failure reason
const MAX_REASON_BODY: usize = 200;

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
	Success,
	Failure(String),
	/// The push service answered `410 Gone`
	Expired,
}

impl DeliveryOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, DeliveryOutcome::Success)
	}

	/// Reason recorded against the subscription, `None` for success
	pub fn reason(&self) -> Option<&str> {
		match self {
			DeliveryOutcome::Success => None,
			DeliveryOutcome::Failure(reason) => Some(reason),
			DeliveryOutcome::Expired => Some("HTTP 410: subscription expired"),
		}
	}
}

impl From<Error> for DeliveryOutcome {
	fn from(err: Error) -> Self {
		match err {
			Error::SubscriptionExpired => DeliveryOutcome::Expired,
			Error::Timeout => DeliveryOutcome::Failure("timeout".into()),
			Error::DeliveryError(reason) => DeliveryOutcome::Failure(reason),
			err => DeliveryOutcome::Failure(err.to_string()),
		}
	}
}

/// Maps a push service response to an error unless it was accepted
pub fn check_response(response: &PushResponse) -> ClResult<()> {
	match response.status {
		200..=299 => Ok(()),
		410 => Err(Error::SubscriptionExpired),
		status => {
			let body = response.body.trim();
			if body.is_empty() {
				Err(Error::DeliveryError(format!("HTTP {}", status)))
			} else {
				let body: String = body.chars().take(MAX_REASON_BODY).collect();
				Err(Error::DeliveryError(format!("HTTP {}: {}", status, body)))
			}
		}
	}
}

/// Classifies a push service response
pub fn classify(response: &PushResponse) -> DeliveryOutcome {
	match check_response(response) {
		Ok(()) => DeliveryOutcome::Success,
		Err(err) => err.into(),
	}
}

/// Sends one encrypted record to one push endpoint
#[derive(Debug, Clone)]
pub struct Dispatcher {
	transport: Arc<dyn PushTransport>,
	ttl: u32,
	timeout: Duration,
}

impl Dispatcher {
	pub fn new(transport: Arc<dyn PushTransport>, ttl: u32, timeout: Duration) -> Self {
		Self { transport, ttl, timeout }
	}

	pub fn build_request(
		&self,
		endpoint: &str,
		vapid: &VapidHeaders,
		record: &EncryptedRecord,
	) -> PushRequest {
		PushRequest {
			endpoint: endpoint.into(),
			headers: vec![
				("Authorization", vapid.authorization.clone()),
				("Crypto-Key", vapid.crypto_key.clone()),
				("Content-Encoding", CONTENT_ENCODING.to_string()),
				("Content-Type", CONTENT_TYPE.to_string()),
				("TTL", self.ttl.to_string()),
			],
			body: record.to_bytes(),
		}
	}

	/// Performs exactly one POST, bounded by the configured timeout
	pub async fn deliver(
		&self,
		endpoint: &str,
		vapid: &VapidHeaders,
		record: &EncryptedRecord,
	) -> DeliveryOutcome {
		let request = self.build_request(endpoint, vapid, record);
		debug!(body_len = request.body.len(), "Posting push message");

		match tokio::time::timeout(self.timeout, self.transport.post(request)).await {
			Ok(Ok(response)) => classify(&response),
			Ok(Err(err)) => err.into(),
			Err(_) => Error::Timeout.into(),
		}
	}

	/// Encrypts `payload` for the subscriber and delivers it
	pub async fn encrypt_and_deliver(
		&self,
		endpoint: &str,
		keys: &ece::SubscriberKeys,
		vapid: &VapidHeaders,
		payload: &[u8],
	) -> DeliveryOutcome {
		match ece::encrypt(payload, keys) {
			Ok(record) => self.deliver(endpoint, vapid, &record).await,
			Err(err) => err.into(),
		}
	}
}


// vim: ts=4
