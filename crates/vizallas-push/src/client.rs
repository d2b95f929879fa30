//! HTTP client for push services

use async_trait::async_trait;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Bytes;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;

use crate::prelude::*;
use vizallas_types::push_transport::{PushRequest, PushResponse, PushTransport};

/// Response bodies are only kept as failure reasons
const MAX_RESPONSE_BODY: usize = 1024;

/// Reads a response body of at most `MAX_RESPONSE_BODY` bytes. Reading stops
/// as soon as the limit is crossed, a longer body yields an empty string.
async fn read_body<B>(body: B) -> String
where
	B: hyper::body::Body,
	B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
	match Limited::new(body, MAX_RESPONSE_BODY).collect().await {
		Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
		Err(e) => {
			debug!(error = %e, "Push service response body not kept");
			String::new()
		}
	}
}

/// Pooled HTTP/1.1 + HTTP/2 client speaking TLS with native roots.
///
/// Plain `http` endpoints are accepted too (local push relays, tests); the
/// registration endpoint only ever stores `https` endpoints.
#[derive(Debug, Clone)]
pub struct HyperPushTransport {
	client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HyperPushTransport {
	pub fn new() -> ClResult<Self> {
		// Another dependency may have installed a provider already
		let _ = rustls::crypto::CryptoProvider::install_default(
			rustls::crypto::aws_lc_rs::default_provider(),
		);

		let connector = HttpsConnectorBuilder::new()
			.with_native_roots()
			.map_err(|_| Error::ConfigError("no native root CA certificates found".into()))?
			.https_or_http()
			.enable_http1()
			.enable_http2()
			.build();
		let client = Client::builder(TokioExecutor::new()).build(connector);

		Ok(Self { client })
	}
}

#[async_trait]
impl PushTransport for HyperPushTransport {
	async fn post(&self, request: PushRequest) -> ClResult<PushResponse> {
		let mut builder = hyper::Request::builder().method(hyper::Method::POST).uri(&*request.endpoint);
		for (name, value) in &request.headers {
			builder = builder.header(*name, value);
		}
		let req = builder
			.body(Full::new(Bytes::from(request.body)))
			.map_err(|e| Error::DeliveryError(format!("request build error: {}", e)))?;

		let response = self
			.client
			.request(req)
			.await
			.map_err(|e| Error::NetworkError(e.to_string()))?;
		let status = response.status().as_u16();

		let body = read_body(response.into_body()).await;

		Ok(PushResponse { status, body })
	}
}


// vim: ts=4
