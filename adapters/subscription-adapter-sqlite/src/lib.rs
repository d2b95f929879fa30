//! SQLite implementation of the push subscription store.
//!
//! Delivery outcome updates are single UPDATE statements, so concurrent
//! requests touching the same subscription resolve as last-write-wins.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use async_trait::async_trait;
use sqlx::sqlite::{self, SqlitePool, SqliteRow};
use std::path::Path;

use vizallas_types::{
	prelude::*,
	subscription_adapter::{
		CreateSubscriptionData, ListSubscriptionOptions, Subscription, SubscriptionAdapter,
	},
};

mod schema;
mod subscription;

// Helper functions
//******************
fn push_in<'a>(
	mut query: sqlx::QueryBuilder<'a, sqlx::Sqlite>,
	values: &[Box<str>],
) -> sqlx::QueryBuilder<'a, sqlx::Sqlite> {
	query.push("(");
	for (i, value) in values.iter().enumerate() {
		if i > 0 {
			query.push(", ");
		}
		query.push_bind(value.to_string());
	}
	query.push(")");
	query
}

fn inspect(err: &sqlx::Error) {
	warn!("DB: {:#?}", err);
}

fn map_res<T, F>(row: Result<SqliteRow, sqlx::Error>, f: F) -> ClResult<T>
where
	F: FnOnce(SqliteRow) -> Result<T, sqlx::Error>,
{
	match row {
		Ok(row) => f(row).inspect_err(inspect).map_err(|_| Error::DbError),
		Err(sqlx::Error::RowNotFound) => Err(Error::NotFound),
		Err(err) => {
			inspect(&err);
			Err(Error::DbError)
		}
	}
}

#[derive(Debug)]
pub struct SubscriptionAdapterSqlite {
	db: SqlitePool,
}

impl SubscriptionAdapterSqlite {
	/// Opens (or creates) the database file at `path`
	pub async fn new(path: impl AsRef<Path>) -> ClResult<Self> {
		let path = path.as_ref();
		if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(dir).await.map_err(|err| {
				error!(path = %dir.display(), error = %err, "Cannot create database directory");
				Error::DbError
			})?;
		}

		let opts = sqlite::SqliteConnectOptions::new()
			.filename(path)
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.inspect_err(inspect)
			.or(Err(Error::DbError))?;

		schema::init_db(&db).await.inspect_err(inspect).or(Err(Error::DbError))?;
		info!(path = %path.display(), "Subscription store opened");

		Ok(Self { db })
	}
}

#[async_trait]
impl SubscriptionAdapter for SubscriptionAdapterSqlite {
	async fn list_subscriptions(
		&self,
		opts: &ListSubscriptionOptions<'_>,
	) -> ClResult<Vec<Subscription>> {
		subscription::list(&self.db, opts).await
	}

	async fn read_subscription(&self, id: &str) -> ClResult<Subscription> {
		subscription::read(&self.db, id).await
	}

	async fn create_subscription(&self, data: &CreateSubscriptionData) -> ClResult<Box<str>> {
		subscription::create(&self.db, data).await
	}

	async fn mark_success(&self, id: &str) -> ClResult<()> {
		subscription::mark_success(&self.db, id).await
	}

	async fn mark_failure(&self, id: &str, reason: &str) -> ClResult<()> {
		subscription::mark_failure(&self.db, id, reason).await
	}

	async fn disable_subscription(&self, id: &str) -> ClResult<()> {
		subscription::disable(&self.db, id).await
	}
}

// vim: ts=4
