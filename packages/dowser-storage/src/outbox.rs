use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{BackfillJob, EmbedOutboxEntry},
};

/// Claims a batch of due backfill jobs by stamping a lease. A job whose lease
/// lapsed without completion becomes claimable again, so a crashed worker
/// never strands work.
pub async fn claim_backfill_batch(
	db: &Db,
	now: OffsetDateTime,
	lease_seconds: i64,
	limit: u32,
) -> Result<Vec<BackfillJob>> {
	let claimed_until = now + Duration::seconds(lease_seconds);
	let mut tx = db.pool.begin().await?;
	let ids: Vec<(Uuid,)> = sqlx::query_as(
		"\
SELECT outbox_id
FROM embed_outbox
WHERE status = 'PENDING'
	AND available_at <= ?1
	AND (claimed_until IS NULL OR claimed_until <= ?1)
ORDER BY available_at ASC
LIMIT ?2",
	)
	.bind(now)
	.bind(i64::from(limit))
	.fetch_all(&mut *tx)
	.await?;

	if ids.is_empty() {
		tx.commit().await?;

		return Ok(Vec::new());
	}

	let mut jobs = Vec::with_capacity(ids.len());

	for (outbox_id,) in ids {
		sqlx::query(
			"\
UPDATE embed_outbox
SET claimed_until = ?2,
	updated_at = ?3
WHERE outbox_id = ?1",
		)
		.bind(outbox_id)
		.bind(claimed_until)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		let job: Option<BackfillJob> = sqlx::query_as(
			"\
SELECT o.outbox_id, o.entry_id, o.tenant_id, o.attempts, i.label, i.body
FROM embed_outbox o
JOIN search_index i ON i.entry_id = o.entry_id
WHERE o.outbox_id = ?1",
		)
		.bind(outbox_id)
		.fetch_optional(&mut *tx)
		.await?;

		match job {
			Some(job) => jobs.push(job),
			// The entry was removed after the job was queued; the job is
			// moot and can go with it.
			None => {
				sqlx::query("DELETE FROM embed_outbox WHERE outbox_id = ?1")
					.bind(outbox_id)
					.execute(&mut *tx)
					.await?;
			},
		}
	}

	tx.commit().await?;

	Ok(jobs)
}

pub async fn mark_done(db: &Db, outbox_id: Uuid, now: OffsetDateTime) -> Result<()> {
	sqlx::query(
		"\
UPDATE embed_outbox
SET status = 'DONE',
	last_error = NULL,
	claimed_until = NULL,
	updated_at = ?2
WHERE outbox_id = ?1",
	)
	.bind(outbox_id)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Records a failed attempt. The job retries after `retry_after` until the
/// attempt budget runs out, then parks as FAILED with the last error kept
/// for inspection.
pub async fn mark_failed(
	db: &Db,
	outbox_id: Uuid,
	error: &str,
	max_attempts: i32,
	retry_after: Duration,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE embed_outbox
SET attempts = attempts + 1,
	last_error = ?2,
	status = CASE WHEN attempts + 1 >= ?3 THEN 'FAILED' ELSE 'PENDING' END,
	available_at = ?4,
	claimed_until = NULL,
	updated_at = ?5
WHERE outbox_id = ?1",
	)
	.bind(outbox_id)
	.bind(error)
	.bind(i64::from(max_attempts))
	.bind(now + retry_after)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn pending_count(db: &Db, tenant_id: &str) -> Result<i64> {
	let count: i64 = sqlx::query_scalar(
		"SELECT COUNT(*) FROM embed_outbox WHERE tenant_id = ?1 AND status = 'PENDING'",
	)
	.bind(tenant_id)
	.fetch_one(&db.pool)
	.await?;

	Ok(count)
}

pub async fn fetch_entry_jobs(db: &Db, entry_id: Uuid) -> Result<Vec<EmbedOutboxEntry>> {
	let rows = sqlx::query_as(
		"\
SELECT *
FROM embed_outbox
WHERE entry_id = ?1
ORDER BY created_at ASC",
	)
	.bind(entry_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Periodic sweep of finished jobs, mirroring the worker's cleanup cadence.
pub async fn delete_finished(db: &Db, older_than: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query(
		"DELETE FROM embed_outbox WHERE status IN ('DONE', 'FAILED') AND updated_at < ?1",
	)
	.bind(older_than)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}
