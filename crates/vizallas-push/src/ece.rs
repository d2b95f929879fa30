//! Message encryption for Web Push (RFC 8291)
//!
//! Produces a single `aes128gcm` record (RFC 8188) per message. Every call
//! generates a fresh ephemeral ECDH key pair and a fresh salt, so two
//! encryptions of the same plaintext for the same subscriber never match.
//!
//! Record layout:
//!
//! ```text
//! +-----------+-----------+--------+------------------------+-----------------+
//! | salt (16) | rs (4 BE) | idlen  | keyid = server pubkey  | ciphertext||tag |
//! |           | = 4096    | (1)=65 | (65, uncompressed)     |                 |
//! +-----------+-----------+--------+------------------------+-----------------+
//! ```

use aes_gcm::{
	Aes128Gcm, Nonce,
	aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use p256::{
	PublicKey, SecretKey,
	ecdh::diffie_hellman,
	elliptic_curve::{
		rand_core::{OsRng, RngCore},
		sec1::ToEncodedPoint,
	},
};
use sha2::Sha256;

use crate::prelude::*;
use vizallas_types::utils::b64url_decode;

pub const CONTENT_ENCODING: &str = "aes128gcm";
pub const CONTENT_TYPE: &str = "application/octet-stream";

pub const SALT_LEN: usize = 16;
pub const RECORD_SIZE: u32 = 4096;
pub const PUBLIC_KEY_LEN: usize = KEY_ID_LEN as usize;
const KEY_ID_LEN: u8 = 65;
pub const AUTH_SECRET_LEN: usize = 16;
const TAG_LEN: usize = 16;
const PADDING_DELIMITER: u8 = 0x02;

/// salt + rs + idlen + keyid
pub const HEADER_LEN: usize = SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN;
/// Largest plaintext that fits one record together with delimiter and tag
pub const MAX_PLAINTEXT_LEN: usize = RECORD_SIZE as usize - HEADER_LEN - 1 - TAG_LEN;

const KEY_INFO_PREFIX: &[u8] = b"WebPush: info\0";
const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";

fn encryption_error(msg: impl Into<String>) -> Error {
	Error::EncryptionError(msg.into())
}

/// A subscriber's ECDH public key and authentication secret
#[derive(Clone)]
pub struct SubscriberKeys {
	public_key: PublicKey,
	public_key_bytes: [u8; PUBLIC_KEY_LEN],
	auth: [u8; AUTH_SECRET_LEN],
}

impl SubscriberKeys {
	pub fn new(p256dh: &[u8], auth: &[u8]) -> ClResult<Self> {
		let public_key_bytes: [u8; PUBLIC_KEY_LEN] = p256dh
			.try_into()
			.ok()
			.filter(|key: &[u8; PUBLIC_KEY_LEN]| key[0] == 0x04)
			.ok_or_else(|| encryption_error("p256dh must be a 65-byte uncompressed P-256 point"))?;
		let public_key = PublicKey::from_sec1_bytes(&public_key_bytes)
			.map_err(|_| encryption_error("p256dh is not a valid P-256 point"))?;
		let auth: [u8; AUTH_SECRET_LEN] =
			auth.try_into().map_err(|_| encryption_error("auth secret must be 16 bytes"))?;

		Ok(Self { public_key, public_key_bytes, auth })
	}

	/// Decodes the base64url `p256dh` and `auth` values of a subscription
	pub fn from_base64(p256dh: &str, auth: &str) -> ClResult<Self> {
		let p256dh = b64url_decode(p256dh).map_err(|_| encryption_error("p256dh is not base64url"))?;
		let auth = b64url_decode(auth).map_err(|_| encryption_error("auth is not base64url"))?;
		Self::new(&p256dh, &auth)
	}

	pub fn public_key_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
		&self.public_key_bytes
	}
}

impl std::fmt::Debug for SubscriberKeys {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SubscriberKeys").finish_non_exhaustive()
	}
}

/// One encrypted `aes128gcm` record. Built per (subscription, message) pair
/// and never reused.
#[derive(Clone)]
pub struct EncryptedRecord {
	pub salt: [u8; SALT_LEN],
	pub record_size: u32,
	/// Ephemeral server public key, carried as the record's key id
	pub server_public_key: [u8; PUBLIC_KEY_LEN],
	/// Ciphertext followed by the 16-byte authentication tag
	pub ciphertext: Vec<u8>,
}

impl EncryptedRecord {
	/// Frames the record into the request body
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut body = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
		body.extend_from_slice(&self.salt);
		body.extend_from_slice(&self.record_size.to_be_bytes());
		body.push(KEY_ID_LEN);
		body.extend_from_slice(&self.server_public_key);
		body.extend_from_slice(&self.ciphertext);
		body
	}

	/// Parses a framed record
	pub fn parse(data: &[u8]) -> ClResult<Self> {
		let header = data.get(..HEADER_LEN).ok_or_else(|| encryption_error("record too short"))?;
		let (salt, rest) = header.split_at(SALT_LEN);
		let (rs, rest) = rest.split_at(4);
		let (idlen, keyid) = rest.split_at(1);
		if idlen[0] != KEY_ID_LEN {
			return Err(encryption_error("unexpected key id length"));
		}

		let record_size = u32::from_be_bytes(rs.try_into().map_err(|_| Error::Parse)?);
		let ciphertext = data[HEADER_LEN..].to_vec();
		if ciphertext.len() < TAG_LEN + 1 {
			return Err(encryption_error("record has no ciphertext"));
		}

		Ok(Self {
			salt: salt.try_into().map_err(|_| Error::Parse)?,
			record_size,
			server_public_key: keyid.try_into().map_err(|_| Error::Parse)?,
			ciphertext,
		})
	}
}

impl std::fmt::Debug for EncryptedRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EncryptedRecord")
			.field("record_size", &self.record_size)
			.field("ciphertext_len", &self.ciphertext.len())
			.finish_non_exhaustive()
	}
}

fn encode_public_key(key: &PublicKey) -> ClResult<[u8; PUBLIC_KEY_LEN]> {
	key.to_encoded_point(false)
		.as_bytes()
		.try_into()
		.map_err(|_| encryption_error("unexpected public key encoding"))
}

struct ContentKeys {
	cek: [u8; 16],
	nonce: [u8; 12],
}

/// Runs the RFC 8291 key schedule.
///
/// `ua_public` / `as_public` are the subscriber's and the application
/// server's (ephemeral) public keys.
fn derive_content_keys(
	ecdh_secret: &[u8],
	auth: &[u8; AUTH_SECRET_LEN],
	ua_public: &[u8; PUBLIC_KEY_LEN],
	as_public: &[u8; PUBLIC_KEY_LEN],
	salt: &[u8; SALT_LEN],
) -> ClResult<ContentKeys> {
	let mut key_info = Vec::with_capacity(KEY_INFO_PREFIX.len() + 2 * PUBLIC_KEY_LEN);
	key_info.extend_from_slice(KEY_INFO_PREFIX);
	key_info.extend_from_slice(ua_public);
	key_info.extend_from_slice(as_public);

	// PRK_key = HMAC-SHA-256(auth_secret, ecdh_secret)
	// IKM = HKDF-Expand(PRK_key, key_info, 32)
	let mut ikm = [0u8; 32];
	Hkdf::<Sha256>::new(Some(auth.as_slice()), ecdh_secret)
		.expand(&key_info, &mut ikm)
		.map_err(|_| encryption_error("HKDF expand failed"))?;

	// PRK = HMAC-SHA-256(salt, IKM)
	let prk = Hkdf::<Sha256>::new(Some(salt.as_slice()), &ikm);
	let mut keys = ContentKeys { cek: [0u8; 16], nonce: [0u8; 12] };
	prk.expand(CEK_INFO, &mut keys.cek).map_err(|_| encryption_error("HKDF expand failed"))?;
	prk.expand(NONCE_INFO, &mut keys.nonce).map_err(|_| encryption_error("HKDF expand failed"))?;

	Ok(keys)
}

/// Encrypts a payload for one subscriber
pub fn encrypt(plaintext: &[u8], keys: &SubscriberKeys) -> ClResult<EncryptedRecord> {
	let ephemeral = SecretKey::random(&mut OsRng);
	let mut salt = [0u8; SALT_LEN];
	OsRng.fill_bytes(&mut salt);

	encrypt_with(plaintext, keys, &ephemeral, salt)
}

fn encrypt_with(
	plaintext: &[u8],
	keys: &SubscriberKeys,
	ephemeral: &SecretKey,
	salt: [u8; SALT_LEN],
) -> ClResult<EncryptedRecord> {
	if plaintext.len() > MAX_PLAINTEXT_LEN {
		return Err(encryption_error(format!(
			"payload of {} bytes exceeds the single record limit of {} bytes",
			plaintext.len(),
			MAX_PLAINTEXT_LEN
		)));
	}

	let server_public_key = encode_public_key(&ephemeral.public_key())?;
	let shared = diffie_hellman(ephemeral.to_nonzero_scalar(), keys.public_key.as_affine());

	let content_keys = derive_content_keys(
		shared.raw_secret_bytes(),
		&keys.auth,
		&keys.public_key_bytes,
		&server_public_key,
		&salt,
	)?;

	let mut padded = Vec::with_capacity(plaintext.len() + 1 + TAG_LEN);
	padded.extend_from_slice(plaintext);
	padded.push(PADDING_DELIMITER);

	let cipher = Aes128Gcm::new_from_slice(&content_keys.cek)
		.map_err(|_| encryption_error("invalid content encryption key"))?;
	let ciphertext = cipher
		.encrypt(Nonce::from_slice(&content_keys.nonce), padded.as_slice())
		.map_err(|_| encryption_error("AES-GCM encryption failed"))?;

	Ok(EncryptedRecord { salt, record_size: RECORD_SIZE, server_public_key, ciphertext })
}

/// Decrypts a single-record `aes128gcm` body with the subscriber's private key.
///
/// This is the receiving side of [`encrypt`]; the service itself never
/// decrypts, it is used to check records end to end.
pub fn decrypt(
	body: &[u8],
	ua_private: &SecretKey,
	auth: &[u8; AUTH_SECRET_LEN],
) -> ClResult<Vec<u8>> {
	let record = EncryptedRecord::parse(body)?;
	let as_public = PublicKey::from_sec1_bytes(&record.server_public_key)
		.map_err(|_| encryption_error("invalid server public key"))?;
	let ua_public = encode_public_key(&ua_private.public_key())?;
	let shared = diffie_hellman(ua_private.to_nonzero_scalar(), as_public.as_affine());

	let content_keys = derive_content_keys(
		shared.raw_secret_bytes(),
		auth,
		&ua_public,
		&record.server_public_key,
		&record.salt,
	)?;

	let cipher = Aes128Gcm::new_from_slice(&content_keys.cek)
		.map_err(|_| encryption_error("invalid content encryption key"))?;
	let mut padded = cipher
		.decrypt(Nonce::from_slice(&content_keys.nonce), record.ciphertext.as_slice())
		.map_err(|_| encryption_error("AES-GCM authentication failed"))?;

	// Strip zero padding, then the last-record delimiter
	while padded.last() == Some(&0) {
		padded.pop();
	}
	if padded.pop() != Some(PADDING_DELIMITER) {
		return Err(encryption_error("missing padding delimiter"));
	}

	Ok(padded)
}


// vim: ts=4
