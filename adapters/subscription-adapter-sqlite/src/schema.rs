//! Database schema initialization

use sqlx::SqlitePool;

/// Creates the tables and indexes if they do not exist yet
pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Subscriptions
	//***************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS subscriptions (
		id text NOT NULL,
		endpoint text NOT NULL,
		p256dh text NOT NULL,
		auth text NOT NULL,
		enabled boolean NOT NULL DEFAULT 1,
		water_level boolean NOT NULL DEFAULT 1,
		drought boolean NOT NULL DEFAULT 0,
		weather boolean NOT NULL DEFAULT 0,
		last_success_at integer,
		last_failure_at integer,
		last_failure_reason text,
		failure_count integer NOT NULL DEFAULT 0,
		created_at integer NOT NULL DEFAULT (unixepoch()),
		PRIMARY KEY(id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_subscriptions_enabled
		ON subscriptions(enabled, created_at)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;
	Ok(())
}

// vim: ts=4
