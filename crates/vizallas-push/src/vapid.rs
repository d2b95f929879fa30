//! VAPID sender authentication (RFC 8292)

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use p256::{
	SecretKey,
	elliptic_curve::{rand_core::OsRng, sec1::ToEncodedPoint},
	pkcs8::{EncodePrivateKey, LineEnding},
};
use serde::Serialize;

use crate::prelude::*;
use vizallas_core::app::VapidConfig;
use vizallas_types::utils::{b64url_decode, b64url_encode};

/// Lifetime of a signed assertion
pub const VAPID_TOKEN_TTL: i64 = 12 * 3600;

#[derive(Serialize)]
struct VapidClaims<'a> {
	aud: &'a str,
	exp: i64,
	sub: &'a str,
}

/// Header values proving the sender identity to one push service
#[derive(Debug, Clone)]
pub struct VapidHeaders {
	pub authorization: String,
	pub crypto_key: String,
}

/// Signs VAPID assertions with one configured key pair.
///
/// Construction validates the key material, so a `VapidSigner` that exists
/// can always sign.
#[derive(Clone)]
pub struct VapidSigner {
	encoding_key: EncodingKey,
	public_key: Box<str>,
	subject: Box<str>,
}

impl std::fmt::Debug for VapidSigner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VapidSigner")
			.field("public_key", &self.public_key)
			.field("subject", &self.subject)
			.finish_non_exhaustive()
	}
}

impl VapidSigner {
	pub fn new(config: &VapidConfig) -> ClResult<Self> {
		let private_key = b64url_decode(&config.private_key)
			.map_err(|_| Error::ConfigError("VAPID private key is not base64url".into()))?;
		let secret_key = SecretKey::from_slice(&private_key)
			.map_err(|_| Error::ConfigError("VAPID private key is not a P-256 scalar".into()))?;

		let public_key = b64url_decode(&config.public_key)
			.map_err(|_| Error::ConfigError("VAPID public key is not base64url".into()))?;
		if secret_key.public_key().to_encoded_point(false).as_bytes() != public_key.as_slice() {
			return Err(Error::ConfigError("VAPID public key does not match the private key".into()));
		}

		if !(config.subject.starts_with("mailto:") || config.subject.starts_with("https:")) {
			return Err(Error::ConfigError("VAPID subject must be a mailto: or https: URI".into()));
		}

		let pem = secret_key
			.to_pkcs8_pem(LineEnding::LF)
			.map_err(|_| Error::ConfigError("failed to encode VAPID private key".into()))?;
		let encoding_key = EncodingKey::from_ec_pem(pem.as_bytes())
			.map_err(|_| Error::ConfigError("invalid VAPID private key".into()))?;

		Ok(Self {
			encoding_key,
			// normalized to unpadded base64url
			public_key: b64url_encode(&public_key).into(),
			subject: config.subject.clone(),
		})
	}

	pub fn public_key(&self) -> &str {
		&self.public_key
	}

	/// Signs an assertion for the push service serving `endpoint`
	pub fn sign(&self, endpoint: &str) -> ClResult<VapidHeaders> {
		self.sign_at(endpoint, Timestamp::now())
	}

	pub fn sign_at(&self, endpoint: &str, now: Timestamp) -> ClResult<VapidHeaders> {
		let aud = audience(endpoint)?;
		let claims =
			VapidClaims { aud: &aud, exp: now.add_seconds(VAPID_TOKEN_TTL).0, sub: &self.subject };

		let jwt = encode(&Header::new(Algorithm::ES256), &claims, &self.encoding_key)
			.map_err(|e| Error::Internal(format!("VAPID signing failed: {}", e)))?;

		Ok(VapidHeaders {
			authorization: format!("vapid t={}, k={}", jwt, self.public_key),
			crypto_key: format!("p256ecdsa={}", self.public_key),
		})
	}
}

/// The origin (scheme, host and non-default port) of a push endpoint
pub fn audience(endpoint: &str) -> ClResult<String> {
	let url = url::Url::parse(endpoint)
		.map_err(|_| Error::DeliveryError("invalid endpoint URL".into()))?;
	if !matches!(url.scheme(), "https" | "http") || url.host_str().is_none() {
		return Err(Error::DeliveryError("endpoint must be an http(s) URL".into()));
	}
	Ok(url.origin().ascii_serialization())
}

/// Generates a fresh VAPID key pair as (public, private) base64url strings
pub fn generate_keypair() -> (String, String) {
	let secret_key = SecretKey::random(&mut OsRng);
	let public_key = secret_key.public_key().to_encoded_point(false);
	(b64url_encode(public_key.as_bytes()), b64url_encode(secret_key.to_bytes()))
}


// vim: ts=4
