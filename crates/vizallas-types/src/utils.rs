//! Utility functions

use base64::{
	Engine,
	engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use serde::de::DeserializeOwned;

use crate::prelude::*;

/// Encode bytes as unpadded base64url
pub fn b64url_encode(data: impl AsRef<[u8]>) -> String {
	URL_SAFE_NO_PAD.encode(data)
}

/// Decode base64url, tolerating trailing padding and the standard alphabet.
///
/// Browsers and client libraries disagree on how `PushSubscription` keys are
/// serialized, so both alphabets are accepted.
pub fn b64url_decode(data: &str) -> ClResult<Vec<u8>> {
	let trimmed = data.trim().trim_end_matches('=');
	URL_SAFE_NO_PAD
		.decode(trimmed)
		.or_else(|_| STANDARD_NO_PAD.decode(trimmed))
		.map_err(|_| Error::Parse)
}

/// Decode a JWT payload without verifying the signature.
///
/// WARNING: Only for inspecting tokens this service issued itself.
pub fn decode_jwt_no_verify<T: DeserializeOwned>(jwt: &str) -> ClResult<T> {
	let mut parts = jwt.splitn(3, '.');
	let _header = parts.next().ok_or(Error::Parse)?;
	let payload = parts.next().ok_or(Error::Parse)?;
	let _sig = parts.next().ok_or(Error::Parse)?;
	let payload = URL_SAFE_NO_PAD.decode(payload.as_bytes()).map_err(|_| Error::Parse)?;
	let payload: T = serde_json::from_slice(&payload).map_err(|_| Error::Parse)?;
	Ok(payload)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_b64url_round_trip() {
		let data = [0xfbu8, 0xff, 0x00, 0x10];
		let encoded = b64url_encode(data);
		assert_eq!(encoded, "-_8AEA");
		assert_eq!(b64url_decode(&encoded).unwrap(), data);
	}

	#[test]
	fn test_b64url_decode_lenient() {
		// Padded and standard alphabet variants of the same bytes
		assert_eq!(b64url_decode("-_8AEA==").unwrap(), [0xfb, 0xff, 0x00, 0x10]);
		assert_eq!(b64url_decode("+/8AEA").unwrap(), [0xfb, 0xff, 0x00, 0x10]);
		assert!(b64url_decode("not base64!").is_err());
	}

	#[test]
	fn test_decode_jwt_no_verify() {
		#[derive(serde::Deserialize)]
		struct Claims {
			sub: String,
		}
		let payload = b64url_encode(br#"{"sub":"mailto:ops@example.com"}"#);
		let jwt = format!("e30.{}.sig", payload);
		let claims: Claims = decode_jwt_no_verify(&jwt).unwrap();
		assert_eq!(claims.sub, "mailto:ops@example.com");

		assert!(decode_jwt_no_verify::<Claims>("only.two").is_err());
	}
}

// vim: ts=4
