//! Shared helpers for the service tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
	Router,
	body::{Body, to_bytes},
	http::{Request, Response, header},
};
use p256::{
	SecretKey,
	elliptic_curve::{rand_core::OsRng, sec1::ToEncodedPoint},
};
use serde_json::Value;
use tower::ServiceExt;

use vizallas::AppBuilder;
use vizallas::app::VapidConfig;
use vizallas::error::{ClResult, Error};
use vizallas::push::ece;
use vizallas::push_transport::{PushRequest, PushResponse, PushTransport};
use vizallas::subscription_adapter::{
	CreateSubscriptionData, ListSubscriptionOptions, NotificationPrefs, Subscription,
	SubscriptionAdapter,
};
use vizallas::types::Timestamp;
use vizallas::utils::b64url_encode;

pub const ORIGIN: &str = "https://vizallas.hu";

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// Subscription store //
//********************//
#[derive(Debug, Default)]
pub struct MemoryAdapter {
	pub subscriptions: Mutex<Vec<Subscription>>,
	/// Every store call, in call order
	pub calls: Mutex<Vec<String>>,
}

impl MemoryAdapter {
	pub fn with(subscriptions: Vec<Subscription>) -> Arc<Self> {
		Arc::new(Self { subscriptions: Mutex::new(subscriptions), ..Default::default() })
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}

	pub fn get(&self, id: &str) -> Option<Subscription> {
		self.subscriptions.lock().unwrap().iter().find(|s| &*s.id == id).cloned()
	}

	fn log(&self, call: String) {
		self.calls.lock().unwrap().push(call);
	}

	fn update(&self, id: &str, f: impl FnOnce(&mut Subscription)) -> ClResult<()> {
		let mut subs = self.subscriptions.lock().unwrap();
		let sub = subs.iter_mut().find(|s| &*s.id == id).ok_or(Error::NotFound)?;
		f(sub);
		Ok(())
	}
}

#[async_trait]
impl SubscriptionAdapter for MemoryAdapter {
	async fn list_subscriptions(
		&self,
		opts: &ListSubscriptionOptions<'_>,
	) -> ClResult<Vec<Subscription>> {
		self.log("list".into());
		let subs = self.subscriptions.lock().unwrap();
		Ok(subs.iter().filter(|s| opts.matches(s)).cloned().collect())
	}

	async fn read_subscription(&self, id: &str) -> ClResult<Subscription> {
		self.get(id).ok_or(Error::NotFound)
	}

	async fn create_subscription(&self, data: &CreateSubscriptionData) -> ClResult<Box<str>> {
		let mut subs = self.subscriptions.lock().unwrap();
		let id: Box<str> = format!("id-{}", subs.len() + 1).into();
		subs.push(Subscription {
			id: id.clone(),
			endpoint: data.endpoint.clone(),
			p256dh: data.p256dh.clone(),
			auth: data.auth.clone(),
			enabled: true,
			prefs: data.prefs,
			last_success_at: None,
			last_failure_at: None,
			last_failure_reason: None,
			failure_count: 0,
			created_at: Timestamp::now(),
		});
		drop(subs);
		self.log(format!("create {}", id));
		Ok(id)
	}

	async fn mark_success(&self, id: &str) -> ClResult<()> {
		self.log(format!("success {}", id));
		self.update(id, |s| {
			s.last_success_at = Some(Timestamp::now());
			s.failure_count = 0;
		})
	}

	async fn mark_failure(&self, id: &str, reason: &str) -> ClResult<()> {
		self.log(format!("failure {}", id));
		self.update(id, |s| {
			s.last_failure_at = Some(Timestamp::now());
			s.last_failure_reason = Some(reason.into());
			s.failure_count += 1;
		})
	}

	async fn disable_subscription(&self, id: &str) -> ClResult<()> {
		self.log(format!("disable {}", id));
		self.update(id, |s| s.enabled = false)
	}
}

// Push transport //
//****************//
/// Records every request and answers with a fixed status per endpoint suffix
#[derive(Debug)]
pub struct MockTransport {
	default_status: u16,
	statuses: Vec<(String, u16)>,
	pub requests: Mutex<Vec<PushRequest>>,
}

impl MockTransport {
	pub fn new(default_status: u16) -> Arc<Self> {
		Self::with_statuses(default_status, &[])
	}

	pub fn with_statuses(default_status: u16, statuses: &[(&str, u16)]) -> Arc<Self> {
		Arc::new(Self {
			default_status,
			statuses: statuses.iter().map(|(s, c)| ((*s).to_string(), *c)).collect(),
			requests: Mutex::new(Vec::new()),
		})
	}

	pub fn requests(&self) -> Vec<PushRequest> {
		self.requests.lock().unwrap().clone()
	}
}

#[async_trait]
impl PushTransport for MockTransport {
	async fn post(&self, request: PushRequest) -> ClResult<PushResponse> {
		let status = self
			.statuses
			.iter()
			.find(|(suffix, _)| request.endpoint.ends_with(suffix.as_str()))
			.map_or(self.default_status, |(_, status)| *status);
		self.requests.lock().unwrap().push(request);
		Ok(PushResponse { status, body: String::new() })
	}
}

// Subscribers //
//*************//
/// A browser-side subscriber holding its private key
pub struct TestSubscriber {
	pub private_key: SecretKey,
	pub auth: [u8; 16],
}

impl TestSubscriber {
	pub fn new() -> Self {
		let mut auth = [0u8; 16];
		p256::elliptic_curve::rand_core::RngCore::fill_bytes(&mut OsRng, &mut auth);
		Self { private_key: SecretKey::random(&mut OsRng), auth }
	}

	pub fn p256dh(&self) -> String {
		b64url_encode(self.private_key.public_key().to_encoded_point(false).as_bytes())
	}

	pub fn auth(&self) -> String {
		b64url_encode(self.auth)
	}

	pub fn subscription(&self, id: &str, endpoint: &str) -> Subscription {
		Subscription {
			id: id.into(),
			endpoint: endpoint.into(),
			p256dh: self.p256dh().into(),
			auth: self.auth().into(),
			enabled: true,
			prefs: NotificationPrefs::default(),
			last_success_at: None,
			last_failure_at: None,
			last_failure_reason: None,
			failure_count: 0,
			created_at: Timestamp(0),
		}
	}

	/// Decrypts a delivered `aes128gcm` body as the browser would
	pub fn decrypt(&self, body: &[u8]) -> Value {
		let plaintext = ece::decrypt(body, &self.private_key, &self.auth).unwrap();
		serde_json::from_slice(&plaintext).unwrap()
	}
}

pub fn vapid_config() -> VapidConfig {
	let (public_key, private_key) = vizallas::push::generate_keypair();
	VapidConfig {
		public_key: public_key.into(),
		private_key: private_key.into(),
		subject: "mailto:riasztas@vizallas.hu".into(),
	}
}

// Router //
//********//
pub fn router(
	adapter: Arc<MemoryAdapter>,
	transport: Arc<dyn PushTransport>,
	vapid: Option<VapidConfig>,
) -> Router {
	init_tracing();
	let mut builder = AppBuilder::new();
	builder.allowed_origins([ORIGIN]).subscription_adapter(adapter).push_transport(transport);
	if let Some(vapid) = vapid {
		builder.vapid(vapid);
	}
	vizallas::routes::init(builder.build().unwrap())
}

pub fn post_json(uri: &str, origin: Option<&str>, body: &str) -> Request<Body> {
	let mut builder = Request::builder()
		.method("POST")
		.uri(uri)
		.header(header::CONTENT_TYPE, "application/json");
	if let Some(origin) = origin {
		builder = builder.header(header::ORIGIN, origin);
	}
	builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> (u16, Value) {
	let res: Response<Body> = router.clone().oneshot(request).await.unwrap();
	let status = res.status().as_u16();
	let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
	let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
	(status, json)
}

// vim: ts=4
