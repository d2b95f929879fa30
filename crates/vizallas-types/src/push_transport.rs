//! Outbound HTTP seam used by the delivery dispatcher.
//!
//! The production implementation speaks HTTP/1.1 and HTTP/2 over TLS to the
//! browser vendors' push services; tests substitute an in-memory transport.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::prelude::*;

/// A fully prepared push service request
#[derive(Clone, Debug)]
pub struct PushRequest {
	pub endpoint: Box<str>,
	pub headers: Vec<(&'static str, String)>,
	pub body: Vec<u8>,
}

impl PushRequest {
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Status and (possibly truncated) body of a push service response
#[derive(Clone, Debug)]
pub struct PushResponse {
	pub status: u16,
	pub body: String,
}

#[async_trait]
pub trait PushTransport: Debug + Send + Sync {
	/// Performs exactly one POST; never retries
	async fn post(&self, request: PushRequest) -> ClResult<PushResponse>;
}

// vim: ts=4
