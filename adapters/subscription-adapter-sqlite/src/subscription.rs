//! Subscription database operations

use sqlx::{
	Row, SqlitePool,
	sqlite::{SqliteQueryResult, SqliteRow},
};

use crate::{inspect, map_res, push_in};
use vizallas_types::{
	prelude::*,
	subscription_adapter::{
		CreateSubscriptionData, ListSubscriptionOptions, NotificationCategory, NotificationPrefs,
		Subscription,
	},
};

const COLUMNS: &str = "id, endpoint, p256dh, auth, enabled, water_level, drought, weather,
	last_success_at, last_failure_at, last_failure_reason, failure_count, created_at";

fn category_column(category: NotificationCategory) -> &'static str {
	match category {
		NotificationCategory::WaterLevel => "water_level",
		NotificationCategory::Drought => "drought",
		NotificationCategory::Weather => "weather",
	}
}

fn from_row(row: &SqliteRow) -> Result<Subscription, sqlx::Error> {
	let failure_count: i64 = row.try_get("failure_count")?;
	Ok(Subscription {
		id: row.try_get::<String, _>("id")?.into(),
		endpoint: row.try_get::<String, _>("endpoint")?.into(),
		p256dh: row.try_get::<String, _>("p256dh")?.into(),
		auth: row.try_get::<String, _>("auth")?.into(),
		enabled: row.try_get("enabled")?,
		prefs: NotificationPrefs {
			water_level: row.try_get("water_level")?,
			drought: row.try_get("drought")?,
			weather: row.try_get("weather")?,
		},
		last_success_at: row.try_get::<Option<i64>, _>("last_success_at")?.map(Timestamp),
		last_failure_at: row.try_get::<Option<i64>, _>("last_failure_at")?.map(Timestamp),
		last_failure_reason: row
			.try_get::<Option<String>, _>("last_failure_reason")?
			.map(Into::into),
		failure_count: u32::try_from(failure_count).unwrap_or(u32::MAX),
		created_at: Timestamp(row.try_get("created_at")?),
	})
}

/// Lists enabled subscriptions matching the options, oldest first
pub(crate) async fn list(
	db: &SqlitePool,
	opts: &ListSubscriptionOptions<'_>,
) -> ClResult<Vec<Subscription>> {
	let mut query = sqlx::QueryBuilder::new(format!("SELECT {} FROM subscriptions WHERE enabled", COLUMNS));

	if let Some(ids) = opts.ids {
		if ids.is_empty() {
			return Ok(Vec::new());
		}
		query.push(" AND id IN ");
		query = push_in(query, ids);
	}
	if let Some(category) = opts.category {
		query.push(" AND ").push(category_column(category));
	}
	query.push(" ORDER BY created_at, id");

	let rows = query.build().fetch_all(db).await.inspect_err(inspect).or(Err(Error::DbError))?;
	rows.iter()
		.map(from_row)
		.collect::<Result<Vec<_>, _>>()
		.inspect_err(inspect)
		.or(Err(Error::DbError))
}

pub(crate) async fn read(db: &SqlitePool, id: &str) -> ClResult<Subscription> {
	let res = sqlx::query(&format!("SELECT {} FROM subscriptions WHERE id = ?", COLUMNS))
		.bind(id)
		.fetch_one(db)
		.await;

	map_res(res, |row| from_row(&row))
}

pub(crate) async fn create(db: &SqlitePool, data: &CreateSubscriptionData) -> ClResult<Box<str>> {
	let id = uuid::Uuid::new_v4().to_string();

	sqlx::query(
		"INSERT INTO subscriptions (id, endpoint, p256dh, auth, water_level, drought, weather, created_at)
		 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(&id)
	.bind(&*data.endpoint)
	.bind(&*data.p256dh)
	.bind(&*data.auth)
	.bind(data.prefs.water_level)
	.bind(data.prefs.drought)
	.bind(data.prefs.weather)
	.bind(Timestamp::now().0)
	.execute(db)
	.await
	.inspect_err(inspect)
	.or(Err(Error::DbError))?;

	Ok(id.into())
}

/// Maps a single-row UPDATE result, `NotFound` when no row matched
fn expect_one(res: Result<SqliteQueryResult, sqlx::Error>) -> ClResult<()> {
	let res = res.inspect_err(inspect).or(Err(Error::DbError))?;
	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

pub(crate) async fn mark_success(db: &SqlitePool, id: &str) -> ClResult<()> {
	let res = sqlx::query(
		"UPDATE subscriptions SET last_success_at = ?, failure_count = 0 WHERE id = ?",
	)
	.bind(Timestamp::now().0)
	.bind(id)
	.execute(db)
	.await;
	expect_one(res)
}

pub(crate) async fn mark_failure(db: &SqlitePool, id: &str, reason: &str) -> ClResult<()> {
	let res = sqlx::query(
		"UPDATE subscriptions
		 SET last_failure_at = ?, last_failure_reason = ?, failure_count = failure_count + 1
		 WHERE id = ?",
	)
	.bind(Timestamp::now().0)
	.bind(reason)
	.bind(id)
	.execute(db)
	.await;
	expect_one(res)
}

pub(crate) async fn disable(db: &SqlitePool, id: &str) -> ClResult<()> {
	let res =
		sqlx::query("UPDATE subscriptions SET enabled = 0 WHERE id = ?").bind(id).execute(db).await;
	expect_one(res)
}

// vim: ts=4
