use axum::{
	Router, middleware,
	routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::prelude::*;
use vizallas_core::cors::cors_guard;
use vizallas_push::handler;

/// The public router. Every route sits behind the CORS guard, so a request
/// from a foreign origin never reaches a handler.
pub fn init(app: App) -> Router {
	let cors = app.opts.cors.clone();

	Router::new()
		.route("/send-push-notification", post(handler::post_send_notification))
		.route("/push-subscription", post(handler::post_subscription))
		.route("/vapid-public-key", get(handler::get_vapid_public_key))
		.layer(middleware::from_fn_with_state(cors, cors_guard))
		.layer(TraceLayer::new_for_http())
		.with_state(app)
}

// vim: ts=4
