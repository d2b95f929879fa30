//! App builder - constructs and runs the push service

use std::{sync::Arc, time::Duration};

use crate::prelude::*;
use crate::routes;
pub use vizallas_core::app::{App, AppOpts, AppState, VERSION, VapidConfig};
use vizallas_core::CorsPolicy;
use vizallas_push::{HyperPushTransport, VapidSigner};
use vizallas_types::push_transport::PushTransport;
use vizallas_types::subscription_adapter::SubscriptionAdapter;

pub struct AppBuilder {
	opts: AppOpts,
	subscription_adapter: Option<Arc<dyn SubscriptionAdapter>>,
	push_transport: Option<Arc<dyn PushTransport>>,
}

impl AppBuilder {
	pub fn new() -> Self {
		// Tests may have installed a subscriber already
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.try_init();
		AppBuilder { opts: AppOpts::default(), subscription_adapter: None, push_transport: None }
	}

	// Opts
	pub fn opts(&mut self, opts: AppOpts) -> &mut Self {
		self.opts = opts;
		self
	}
	pub fn listen(&mut self, listen: impl Into<Box<str>>) -> &mut Self {
		self.opts.listen = listen.into();
		self
	}
	pub fn allowed_origins(
		&mut self,
		origins: impl IntoIterator<Item = impl Into<Box<str>>>,
	) -> &mut Self {
		self.opts.cors = CorsPolicy::new(origins);
		self
	}
	pub fn vapid(&mut self, vapid: VapidConfig) -> &mut Self {
		self.opts.vapid = Some(vapid);
		self
	}
	pub fn push_ttl(&mut self, ttl: u32) -> &mut Self {
		self.opts.push_ttl = ttl;
		self
	}
	pub fn push_timeout(&mut self, timeout: Duration) -> &mut Self {
		self.opts.push_timeout = timeout;
		self
	}
	pub fn push_concurrency(&mut self, concurrency: usize) -> &mut Self {
		self.opts.push_concurrency = concurrency;
		self
	}

	// Adapters
	pub fn subscription_adapter(&mut self, adapter: Arc<dyn SubscriptionAdapter>) -> &mut Self {
		self.subscription_adapter = Some(adapter);
		self
	}
	pub fn push_transport(&mut self, transport: Arc<dyn PushTransport>) -> &mut Self {
		self.push_transport = Some(transport);
		self
	}

	/// Assembles the application state. Missing VAPID keys are not fatal
	/// here: the service starts, and every send request fails with 500.
	pub fn build(self) -> ClResult<App> {
		let _ = rustls::crypto::CryptoProvider::install_default(
			rustls::crypto::aws_lc_rs::default_provider(),
		);

		let Some(subscription_adapter) = self.subscription_adapter else {
			error!("FATAL: No subscription adapter configured");
			return Err(Error::Internal("No subscription adapter configured".to_string()));
		};
		let push_transport: Arc<dyn PushTransport> = match self.push_transport {
			Some(transport) => transport,
			None => Arc::new(HyperPushTransport::new()?),
		};

		match &self.opts.vapid {
			None => warn!("VAPID keys are not configured, push notifications are disabled"),
			Some(vapid) => match VapidSigner::new(vapid) {
				Ok(signer) => info!(public_key = %signer.public_key(), "VAPID keys loaded"),
				Err(e) => error!(error = %e, "Invalid VAPID configuration"),
			},
		}
		if self.opts.cors.origins().is_empty() {
			warn!("ALLOWED_ORIGINS is empty, every browser request will be refused");
		}

		Ok(Arc::new(AppState { opts: self.opts, subscription_adapter, push_transport }))
	}

	pub async fn run(self) -> ClResult<()> {
		info!("Vízállás push service V{}", VERSION);

		let app = self.build()?;
		let router = routes::init(app.clone());

		let listener = tokio::net::TcpListener::bind(app.opts.listen.as_ref()).await.map_err(|e| {
			error!("FATAL: Cannot listen on {}: {}", app.opts.listen, e);
			Error::Internal(format!("Cannot listen on {}: {}", app.opts.listen, e))
		})?;
		info!("Listening on HTTP {}", app.opts.listen);

		axum::serve(listener, router)
			.with_graceful_shutdown(shutdown_signal())
			.await
			.map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

		info!("Shut down");
		Ok(())
	}
}

impl Default for AppBuilder {
	fn default() -> Self {
		Self::new()
	}
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		warn!("Cannot listen for shutdown signal: {}", e);
		std::future::pending::<()>().await;
	}
}

// vim: ts=4
