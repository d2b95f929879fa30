//! CORS allow-list middleware
//!
//! Browser requests are accepted only from an explicit list of origins.
//! Non-preflight requests from any other origin (or without an `Origin`
//! header) are refused with 403 before the body is read, so a refused
//! request never reaches a handler or the subscription store. `OPTIONS`
//! preflights are always answered, carrying the headers of the resolved
//! origin.

use std::sync::Arc;

use axum::{
	body::Body,
	extract::{Request, State},
	http::{HeaderMap, HeaderValue, Method, StatusCode, header},
	middleware::Next,
	response::{IntoResponse, Response},
};

use crate::prelude::*;

pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const PREFLIGHT_MAX_AGE: &str = "86400";

#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
	origins: Arc<[Box<str>]>,
}

impl CorsPolicy {
	pub fn new(origins: impl IntoIterator<Item = impl Into<Box<str>>>) -> Self {
		let origins = origins
			.into_iter()
			.map(Into::into)
			.map(|o: Box<str>| o.trim().trim_end_matches('/').into())
			.filter(|o: &Box<str>| !o.is_empty())
			.collect();
		Self { origins }
	}

	/// Parses a comma-separated origin list (as found in the environment)
	pub fn from_list(list: &str) -> Self {
		Self::new(list.split(','))
	}

	pub fn origins(&self) -> &[Box<str>] {
		&self.origins
	}

	pub fn is_allowed(&self, origin: &str) -> bool {
		self.origins.iter().any(|o| o.as_ref() == origin)
	}

	/// The origin echoed back in CORS headers: the request origin when it is
	/// allowed, otherwise the first configured origin.
	pub fn resolve<'a>(&'a self, origin: Option<&'a str>) -> Option<&'a str> {
		match origin {
			Some(origin) if self.is_allowed(origin) => Some(origin),
			_ => self.origins.first().map(AsRef::as_ref),
		}
	}

	/// Set by hand since tower-http's `CorsLayer` can neither refuse with 403
	/// nor fall back to the first allowed origin.
	fn apply_headers(&self, headers: &mut HeaderMap, origin: Option<&str>) {
		if let Some(value) = self.resolve(origin).and_then(|o| HeaderValue::from_str(o).ok()) {
			headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
		}
		headers.insert(
			header::ACCESS_CONTROL_ALLOW_HEADERS,
			HeaderValue::from_static(ALLOWED_HEADERS),
		);
		headers.insert(
			header::ACCESS_CONTROL_ALLOW_METHODS,
			HeaderValue::from_static(ALLOWED_METHODS),
		);
		headers.insert(header::VARY, HeaderValue::from_static("Origin"));
	}
}

pub async fn cors_guard(
	State(policy): State<CorsPolicy>,
	req: Request<Body>,
	next: Next,
) -> Response {
	let origin = req.headers().get(header::ORIGIN).and_then(|h| h.to_str().ok()).map(String::from);

	if req.method() == Method::OPTIONS {
		let mut res = StatusCode::NO_CONTENT.into_response();
		policy.apply_headers(res.headers_mut(), origin.as_deref());
		if let Ok(max_age) = HeaderValue::from_str(PREFLIGHT_MAX_AGE) {
			res.headers_mut().insert(header::ACCESS_CONTROL_MAX_AGE, max_age);
		}
		return res;
	}

	match origin.as_deref() {
		Some(o) if policy.is_allowed(o) => {
			let mut res = next.run(req).await;
			policy.apply_headers(res.headers_mut(), Some(o));
			res
		}
		_ => {
			warn!(
				origin = origin.as_deref().unwrap_or("-"),
				path = req.uri().path(),
				"Rejecting request from unauthorized origin"
			);
			Error::PermissionDenied.into_response()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{Router, middleware, routing::post};
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tower::ServiceExt;

	async fn counting_handler(State(calls): State<Arc<AtomicUsize>>, body: String) -> String {
		calls.fetch_add(1, Ordering::SeqCst);
		body
	}

	fn router(calls: Arc<AtomicUsize>) -> Router {
		let policy = CorsPolicy::from_list("https://vizallas.hu, https://app.vizallas.hu/");
		Router::new()
			.route("/echo", post(counting_handler))
			.layer(middleware::from_fn_with_state(policy, cors_guard))
			.with_state(calls)
	}

	fn request(method: Method, origin: Option<&str>) -> Request<Body> {
		let mut builder = Request::builder().method(method).uri("/echo");
		if let Some(origin) = origin {
			builder = builder.header(header::ORIGIN, origin);
		}
		builder.body(Body::from("{\"title\":\"x\"}")).unwrap()
	}

	#[test]
	fn test_policy_parsing() {
		let policy = CorsPolicy::from_list(" https://a.example , ,https://b.example/");
		assert_eq!(policy.origins().len(), 2);
		assert!(policy.is_allowed("https://b.example"));
		assert!(!policy.is_allowed("https://c.example"));
		assert_eq!(policy.resolve(Some("https://c.example")), Some("https://a.example"));
		assert_eq!(policy.resolve(Some("https://b.example")), Some("https://b.example"));
		assert_eq!(CorsPolicy::default().resolve(Some("https://a.example")), None);
	}

	#[tokio::test]
	async fn test_allowed_origin_passes() {
		let calls = Arc::new(AtomicUsize::new(0));
		let res = router(calls.clone())
			.oneshot(request(Method::POST, Some("https://vizallas.hu")))
			.await
			.unwrap();
		assert_eq!(res.status(), StatusCode::OK);
		assert_eq!(
			res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
			"https://vizallas.hu"
		);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_foreign_origin_rejected_before_handler() {
		let calls = Arc::new(AtomicUsize::new(0));

		let res = router(calls.clone())
			.oneshot(request(Method::POST, Some("https://evil.example")))
			.await
			.unwrap();
		assert_eq!(res.status(), StatusCode::FORBIDDEN);

		let res = router(calls.clone()).oneshot(request(Method::POST, None)).await.unwrap();
		assert_eq!(res.status(), StatusCode::FORBIDDEN);

		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_preflight_answered_with_resolved_origin() {
		let res = router(Arc::new(AtomicUsize::new(0)))
			.oneshot(request(Method::OPTIONS, Some("https://app.vizallas.hu")))
			.await
			.unwrap();
		assert_eq!(res.status(), StatusCode::NO_CONTENT);
		assert_eq!(
			res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
			"https://app.vizallas.hu"
		);
		assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), ALLOWED_METHODS);

		let res = router(Arc::new(AtomicUsize::new(0)))
			.oneshot(request(Method::OPTIONS, Some("https://evil.example")))
			.await
			.unwrap();
		assert_eq!(res.status(), StatusCode::NO_CONTENT);
		assert_eq!(
			res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
			"https://vizallas.hu"
		);
	}
}

// vim: ts=4
