//! Deployment configuration read from the environment

use std::{path::PathBuf, time::Duration};

use crate::prelude::*;
use vizallas_core::{
	CorsPolicy,
	app::{AppOpts, DEFAULT_PUSH_CONCURRENCY, DEFAULT_PUSH_TIMEOUT, VapidConfig},
};

pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:admin@localhost";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub const DEFAULT_DB_DIR: &str = "./data";
pub const DB_FILE: &str = "subscriptions.db";

#[derive(Debug, Clone)]
pub struct Config {
	pub opts: AppOpts,
	pub db_dir: PathBuf,
}

impl Config {
	pub fn from_env() -> ClResult<Self> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Builds the configuration from a variable lookup. Empty values count as
	/// unset.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ClResult<Self> {
		let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

		let vapid = match (var("VAPID_PUBLIC_KEY"), var("VAPID_PRIVATE_KEY")) {
			(Some(public_key), Some(private_key)) => Some(VapidConfig {
				public_key: public_key.into(),
				private_key: private_key.into(),
				subject: var("VAPID_SUBJECT").unwrap_or_else(|| DEFAULT_VAPID_SUBJECT.into()).into(),
			}),
			_ => None,
		};

		let push_timeout = match var("PUSH_TIMEOUT_SECS") {
			Some(secs) => Duration::from_secs(parse_number(&secs, "PUSH_TIMEOUT_SECS")?),
			None => DEFAULT_PUSH_TIMEOUT,
		};
		let push_concurrency = match var("PUSH_CONCURRENCY") {
			Some(n) => usize::try_from(parse_number(&n, "PUSH_CONCURRENCY")?)
				.map_err(|_| Error::ConfigError("PUSH_CONCURRENCY is out of range".into()))?,
			None => DEFAULT_PUSH_CONCURRENCY,
		};

		let opts = AppOpts {
			listen: var("LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.into()).into(),
			cors: CorsPolicy::from_list(&var("ALLOWED_ORIGINS").unwrap_or_default()),
			vapid,
			push_timeout,
			push_concurrency,
			..AppOpts::default()
		};

		Ok(Self { opts, db_dir: var("DB_DIR").unwrap_or_else(|| DEFAULT_DB_DIR.into()).into() })
	}

	pub fn db_path(&self) -> PathBuf {
		self.db_dir.join(DB_FILE)
	}
}

fn parse_number(value: &str, name: &str) -> ClResult<u64> {
	match value.parse::<u64>() {
		Ok(n) if n > 0 => Ok(n),
		_ => Err(Error::ConfigError(format!("{} must be a positive integer", name))),
	}
}


// vim: ts=4
