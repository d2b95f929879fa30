//! Notification request validation
//!
//! The request body is parsed field by field from a loose JSON value into a
//! strict [`NotificationRequest`], collecting every violation instead of
//! stopping at the first one.

use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::ece::MAX_PLAINTEXT_LEN;
use crate::prelude::*;
use vizallas_types::subscription_adapter::NotificationCategory;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_BODY_LEN: usize = 500;
pub const MAX_ICON_LEN: usize = 500;
pub const MAX_TAG_LEN: usize = 100;
pub const MAX_DATA_LEN: usize = 2000;
pub const MAX_SUBSCRIPTION_IDS: usize = 100;

/// The JSON document delivered to the service worker
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
	pub title: String,
	pub body: String,
	pub icon: Option<String>,
	pub badge: Option<String>,
	pub tag: Option<String>,
	pub data: Option<Map<String, Value>>,
}

#[derive(Debug, Clone)]
pub struct NotificationRequest {
	pub payload: NotificationPayload,
	/// Explicit targets; `None` selects by category
	pub subscription_ids: Option<Vec<Box<str>>>,
	pub category: NotificationCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
	pub field: &'static str,
	pub message: String,
}

impl Violation {
	fn new(field: &'static str, message: impl Into<String>) -> Self {
		Self { field, message: message.into() }
	}
}

/// A rejected request: 400 with every violation listed
#[derive(Debug)]
pub struct ValidationFailure(pub Vec<Violation>);

impl IntoResponse for ValidationFailure {
	fn into_response(self) -> Response {
		debug!(violations = self.0.len(), "Rejecting invalid notification request");
		(
			StatusCode::BAD_REQUEST,
			Json(serde_json::json!({ "error": "Invalid request", "details": self.0 })),
		)
			.into_response()
	}
}

/// Reads a string field; `null` counts as absent
fn string_field(
	obj: &Map<String, Value>,
	field: &'static str,
	required: bool,
	max_len: usize,
	violations: &mut Vec<Violation>,
) -> Option<String> {
	match obj.get(field) {
		None | Some(Value::Null) => {
			if required {
				violations.push(Violation::new(field, "is required"));
			}
			None
		}
		Some(Value::String(s)) => {
			let len = s.chars().count();
			if required && len == 0 {
				violations.push(Violation::new(field, "must not be empty"));
				None
			} else if len > max_len {
				violations.push(Violation::new(
					field,
					format!("must be at most {} characters", max_len),
				));
				None
			} else {
				Some(s.clone())
			}
		}
		Some(_) => {
			violations.push(Violation::new(field, "must be a string"));
			None
		}
	}
}

fn data_field(obj: &Map<String, Value>, violations: &mut Vec<Violation>) -> Option<Map<String, Value>> {
	match obj.get("data") {
		None | Some(Value::Null) => None,
		Some(Value::Object(data)) => {
			let len = serde_json::to_string(data).map(|s| s.chars().count()).unwrap_or(usize::MAX);
			if len > MAX_DATA_LEN {
				violations.push(Violation::new(
					"data",
					format!("must serialize to at most {} characters", MAX_DATA_LEN),
				));
				None
			} else {
				Some(data.clone())
			}
		}
		Some(_) => {
			violations.push(Violation::new("data", "must be an object"));
			None
		}
	}
}

fn subscription_ids_field(
	obj: &Map<String, Value>,
	violations: &mut Vec<Violation>,
) -> Option<Vec<Box<str>>> {
	match obj.get("subscriptionIds") {
		None | Some(Value::Null) => None,
		Some(Value::Array(ids)) => {
			if ids.len() > MAX_SUBSCRIPTION_IDS {
				violations.push(Violation::new(
					"subscriptionIds",
					format!("must contain at most {} entries", MAX_SUBSCRIPTION_IDS),
				));
				return None;
			}
			let ids: Option<Vec<Box<str>>> =
				ids.iter().map(|id| id.as_str().map(Box::from)).collect();
			if ids.is_none() {
				violations.push(Violation::new("subscriptionIds", "entries must be strings"));
			}
			ids
		}
		Some(_) => {
			violations.push(Violation::new("subscriptionIds", "must be an array of strings"));
			None
		}
	}
}

fn category_field(obj: &Map<String, Value>, violations: &mut Vec<Violation>) -> NotificationCategory {
	match obj.get("category") {
		None | Some(Value::Null) => NotificationCategory::default(),
		Some(Value::String(s)) => NotificationCategory::parse(s).unwrap_or_else(|| {
			violations.push(Violation::new("category", "must be one of waterLevel, drought, weather"));
			NotificationCategory::default()
		}),
		Some(_) => {
			violations.push(Violation::new("category", "must be a string"));
			NotificationCategory::default()
		}
	}
}

impl NotificationRequest {
	pub fn parse(value: &Value) -> Result<Self, ValidationFailure> {
		let Some(obj) = value.as_object() else {
			return Err(ValidationFailure(vec![Violation::new("request", "must be a JSON object")]));
		};

		let mut violations = Vec::new();
		let title = string_field(obj, "title", true, MAX_TITLE_LEN, &mut violations);
		let body = string_field(obj, "body", true, MAX_BODY_LEN, &mut violations);
		let icon = string_field(obj, "icon", false, MAX_ICON_LEN, &mut violations);
		let badge = string_field(obj, "badge", false, MAX_ICON_LEN, &mut violations);
		let tag = string_field(obj, "tag", false, MAX_TAG_LEN, &mut violations);
		let data = data_field(obj, &mut violations);
		let subscription_ids = subscription_ids_field(obj, &mut violations);
		let category = category_field(obj, &mut violations);

		let (Some(title), Some(body), true) = (title, body, violations.is_empty()) else {
			return Err(ValidationFailure(violations));
		};

		let request = Self {
			payload: NotificationPayload { title, body, icon, badge, tag, data },
			subscription_ids,
			category,
		};

		// Multi-byte text can push a bounded request over one record
		match request.payload_bytes() {
			Ok(bytes) if bytes.len() <= MAX_PLAINTEXT_LEN => Ok(request),
			Ok(_) => Err(ValidationFailure(vec![Violation::new(
				"payload",
				format!("encoded notification must be at most {} bytes", MAX_PLAINTEXT_LEN),
			)])),
			Err(_) => Err(ValidationFailure(vec![Violation::new("payload", "cannot be encoded")])),
		}
	}

	/// The plaintext encrypted for every subscriber
	pub fn payload_bytes(&self) -> ClResult<Vec<u8>> {
		Ok(serde_json::to_vec(&self.payload)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn fields(result: Result<NotificationRequest, ValidationFailure>) -> Vec<&'static str> {
		match result {
			Ok(_) => Vec::new(),
			Err(ValidationFailure(violations)) => violations.iter().map(|v| v.field).collect(),
		}
	}

	#[test]
	fn test_minimal_request() {
		let req = NotificationRequest::parse(&json!({ "title": "T", "body": "B" })).unwrap();
		assert_eq!(req.payload.title, "T");
		assert!(req.subscription_ids.is_none());
		assert_eq!(req.category, NotificationCategory::WaterLevel);
		assert_eq!(req.payload_bytes().unwrap(), br#"{"title":"T","body":"B"}"#);
	}

	#[test]
	fn test_full_request() {
		let req = NotificationRequest::parse(&json!({
			"title": "Vízállás riasztás",
			"body": "Mohács eléri a 420 cm-t",
			"icon": "/icons/icon-192.png",
			"badge": "/icons/badge.png",
			"tag": "mohacs",
			"data": { "url": "/allomas/mohacs", "level": 420 },
			"subscriptionIds": ["id-1", "id-2"],
			"category": "drought",
			"unknownField": true,
		}))
		.unwrap();
		assert_eq!(req.subscription_ids.as_deref().map(<[_]>::len), Some(2));
		assert_eq!(req.category, NotificationCategory::Drought);
		assert_eq!(req.payload.data.as_ref().unwrap()["level"], 420);
	}

	#[test]
	fn test_title_boundaries() {
		let ok = |title: String| NotificationRequest::parse(&json!({ "title": title, "body": "B" }));
		assert_eq!(fields(ok(String::new())), ["title"]);
		assert!(ok("a".into()).is_ok());
		assert!(ok("á".repeat(100)).is_ok());
		assert_eq!(fields(ok("a".repeat(101))), ["title"]);
	}

	#[test]
	fn test_body_boundaries() {
		let ok = |body: String| NotificationRequest::parse(&json!({ "title": "T", "body": body }));
		assert_eq!(fields(ok(String::new())), ["body"]);
		assert!(ok("b".into()).is_ok());
		assert!(ok("b".repeat(500)).is_ok());
		assert_eq!(fields(ok("b".repeat(501))), ["body"]);
	}

	#[test]
	fn test_optional_field_bounds() {
		let req = |extra: Value| {
			let mut value = json!({ "title": "T", "body": "B" });
			value.as_object_mut().unwrap().extend(extra.as_object().unwrap().clone());
			NotificationRequest::parse(&value)
		};
		assert!(req(json!({ "icon": "i".repeat(500), "tag": "t".repeat(100) })).is_ok());
		assert_eq!(fields(req(json!({ "icon": "i".repeat(501) }))), ["icon"]);
		assert_eq!(fields(req(json!({ "badge": "i".repeat(501) }))), ["badge"]);
		assert_eq!(fields(req(json!({ "tag": "t".repeat(101) }))), ["tag"]);
		assert_eq!(fields(req(json!({ "data": [1, 2] }))), ["data"]);
		assert_eq!(fields(req(json!({ "data": { "k": "v".repeat(2000) } }))), ["data"]);
		assert_eq!(fields(req(json!({ "category": "flood" }))), ["category"]);
		assert!(req(json!({ "icon": null, "data": null })).is_ok());
	}

	#[test]
	fn test_subscription_ids_bounds() {
		let req = |ids: Value| NotificationRequest::parse(&json!({ "title": "T", "body": "B", "subscriptionIds": ids }));
		let ids: Vec<String> = (0..100).map(|i| format!("id-{}", i)).collect();
		assert!(req(json!(ids)).is_ok());
		let ids: Vec<String> = (0..101).map(|i| format!("id-{}", i)).collect();
		assert_eq!(fields(req(json!(ids))), ["subscriptionIds"]);
		assert_eq!(fields(req(json!(["id-1", 2]))), ["subscriptionIds"]);
		assert_eq!(fields(req(json!("id-1"))), ["subscriptionIds"]);
		assert_eq!(req(json!([])).unwrap().subscription_ids.unwrap().len(), 0);
	}

	#[test]
	fn test_collects_all_violations() {
		let result = NotificationRequest::parse(&json!({
			"title": "",
			"body": 42,
			"tag": "t".repeat(101),
			"subscriptionIds": {},
		}));
		assert_eq!(fields(result), ["title", "body", "tag", "subscriptionIds"]);

		assert_eq!(fields(NotificationRequest::parse(&json!({}))), ["title", "body"]);
		assert_eq!(fields(NotificationRequest::parse(&json!([1]))), ["request"]);
	}

	#[test]
	fn test_oversized_payload() {
		// Every field within bounds, but 4-byte characters overflow one record
		let result = NotificationRequest::parse(&json!({
			"title": "🌊".repeat(100),
			"body": "🌊".repeat(500),
			"icon": "🌊".repeat(500),
			"badge": "🌊".repeat(100),
		}));
		assert_eq!(fields(result), ["payload"]);
	}

	#[tokio::test]
	async fn test_failure_response() {
		let res = ValidationFailure(vec![Violation::new("title", "is required")]).into_response();
		assert_eq!(res.status(), StatusCode::BAD_REQUEST);
		let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
		let body: Value = serde_json::from_slice(&body).unwrap();
		assert_eq!(body["error"], "Invalid request");
		assert_eq!(body["details"][0]["field"], "title");
	}
}

// vim: ts=4
