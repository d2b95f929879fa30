//! Error taxonomy shared by every crate of the workspace.
//!
//! Whole-request errors (`ValidationError`, `ConfigError`) abort a request
//! before any delivery is attempted. Per-subscription errors
//! (`EncryptionError`, `DeliveryError`, `SubscriptionExpired`, `Timeout`,
//! `NetworkError`) are caught by the fan-out and recorded against the
//! subscription instead of being returned to the caller.

use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	NotFound,
	DbError,
	Parse,
	Timeout,
	PermissionDenied,
	ValidationError(String),
	ConfigError(String),
	EncryptionError(String),
	DeliveryError(String),
	SubscriptionExpired,
	NetworkError(String),
	Internal(String),
}

impl Error {
	/// True for errors that only concern one subscription of a fan-out
	pub fn is_per_subscription(&self) -> bool {
		matches!(
			self,
			Error::EncryptionError(_)
				| Error::DeliveryError(_)
				| Error::SubscriptionExpired
				| Error::Timeout
				| Error::NetworkError(_)
		)
	}

	fn status_and_message(&self) -> (StatusCode, &'static str) {
		match self {
			Error::NotFound => (StatusCode::NOT_FOUND, "Not found"),
			Error::PermissionDenied => (StatusCode::FORBIDDEN, "Origin not allowed"),
			Error::ValidationError(_) | Error::Parse => (StatusCode::BAD_REQUEST, "Invalid request"),
			Error::ConfigError(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "Push notifications are not configured")
			}
			Error::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Upstream timeout"),
			Error::NetworkError(_) | Error::DeliveryError(_) | Error::SubscriptionExpired => {
				(StatusCode::BAD_GATEWAY, "Delivery failed")
			}
			Error::DbError | Error::EncryptionError(_) | Error::Internal(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
			}
		}
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::NotFound => write!(f, "not found"),
			Error::DbError => write!(f, "database error"),
			Error::Parse => write!(f, "parse error"),
			Error::Timeout => write!(f, "timeout"),
			Error::PermissionDenied => write!(f, "permission denied"),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::ConfigError(msg) => write!(f, "configuration error: {}", msg),
			Error::EncryptionError(msg) => write!(f, "encryption error: {}", msg),
			Error::DeliveryError(msg) => write!(f, "delivery error: {}", msg),
			Error::SubscriptionExpired => write!(f, "subscription expired (410 Gone)"),
			Error::NetworkError(msg) => write!(f, "network error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		tracing::debug!(error = %err, "JSON error");
		Self::Parse
	}
}

/// Only generic messages reach the client, details stay in the server log.
impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let (status, message) = self.status_and_message();
		if status.is_server_error() {
			tracing::error!(error = %self, "Request failed");
		} else {
			tracing::debug!(error = %self, "Request rejected");
		}
		(status, Json(serde_json::json!({ "error": message }))).into_response()
	}
}


// vim: ts=4
