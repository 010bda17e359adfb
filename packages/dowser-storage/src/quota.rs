use crate::{Result, db::Db, models::QuotaRow};

pub async fn fetch_quota(db: &Db, tenant_id: &str) -> Result<Option<QuotaRow>> {
	let row = sqlx::query_as(
		"\
SELECT *
FROM quota_state
WHERE tenant_id = ?1",
	)
	.bind(tenant_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

/// First-touch seeding of a tenant's quota row. Loses the race gracefully:
/// returns false when another writer inserted first.
pub async fn insert_quota(db: &Db, row: &QuotaRow) -> Result<bool> {
	let result = sqlx::query(
		"\
INSERT OR IGNORE INTO quota_state (
	tenant_id, daily_used, daily_reset_on, monthly_spent_cents, monthly_cap_cents,
	monthly_reset_on, version
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
	)
	.bind(row.tenant_id.as_str())
	.bind(row.daily_used)
	.bind(row.daily_reset_on)
	.bind(row.monthly_spent_cents)
	.bind(row.monthly_cap_cents)
	.bind(row.monthly_reset_on)
	.bind(row.version)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Optimistic-concurrency write: applies the new counters only if the row
/// still carries the version the caller read. False means a concurrent
/// consume won; reread and retry.
pub async fn cas_update_quota(db: &Db, row: &QuotaRow, expected_version: i64) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE quota_state
SET daily_used = ?2,
	daily_reset_on = ?3,
	monthly_spent_cents = ?4,
	monthly_cap_cents = ?5,
	monthly_reset_on = ?6,
	version = version + 1
WHERE tenant_id = ?1 AND version = ?7",
	)
	.bind(row.tenant_id.as_str())
	.bind(row.daily_used)
	.bind(row.daily_reset_on)
	.bind(row.monthly_spent_cents)
	.bind(row.monthly_cap_cents)
	.bind(row.monthly_reset_on)
	.bind(expected_version)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}
