use std::{sync::Arc, time::Duration as StdDuration};

use color_eyre::{Result, eyre};
use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use dowser_domain::compose;
use dowser_service::EmbeddingProvider;
use dowser_storage::{
	db::Db,
	index::store_embedding,
	models::BackfillJob,
	outbox::{claim_backfill_batch, delete_finished, mark_done, mark_failed},
};

const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const CLEANUP_INTERVAL_SECONDS: i64 = 900;
const FINISHED_RETENTION_SECONDS: i64 = 86_400;
const MAX_JOB_ERROR_CHARS: usize = 1_024;

pub struct WorkerState {
	pub db: Db,
	pub embedding: dowser_config::EmbeddingProviderConfig,
	pub worker: dowser_config::Worker,
	pub provider: Arc<dyn EmbeddingProvider>,
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	let mut last_cleanup = OffsetDateTime::now_utc();

	loop {
		if let Err(err) = process_backfill_once(&state).await {
			tracing::error!(error = %err, "Backfill batch failed.");
		}

		let now = OffsetDateTime::now_utc();

		if now - last_cleanup >= Duration::seconds(CLEANUP_INTERVAL_SECONDS) {
			let cutoff = now - Duration::seconds(FINISHED_RETENTION_SECONDS);

			match delete_finished(&state.db, cutoff).await {
				Ok(count) => {
					if count > 0 {
						tracing::info!(count, "Swept finished backfill jobs.");
					}

					last_cleanup = now;
				},
				Err(err) => {
					tracing::error!(error = %err, "Backfill sweep failed.");
				},
			}
		}

		tokio_time::sleep(StdDuration::from_millis(state.worker.poll_interval_ms)).await;
	}
}

/// Claims one batch of embedding jobs and runs each to completion. Public so
/// tests can drive the worker without the poll loop. Returns how many jobs
/// finished.
pub async fn process_backfill_once(state: &WorkerState) -> Result<u32> {
	let now = OffsetDateTime::now_utc();
	let jobs = claim_backfill_batch(
		&state.db,
		now,
		state.worker.claim_lease_seconds,
		state.worker.batch_size,
	)
	.await?;
	let mut completed = 0;

	for job in jobs {
		match embed_job(state, &job).await {
			Ok(()) => {
				mark_done(&state.db, job.outbox_id, OffsetDateTime::now_utc()).await?;

				completed += 1;
			},
			Err(err) => {
				mark_failed(
					&state.db,
					job.outbox_id,
					&sanitize_job_error(&err.to_string()),
					state.worker.max_attempts,
					backoff_for_attempt(job.attempts + 1),
					OffsetDateTime::now_utc(),
				)
				.await?;
				tracing::error!(error = %err, outbox_id = %job.outbox_id, "Backfill job failed.");
			},
		}
	}

	Ok(completed)
}

async fn embed_job(state: &WorkerState, job: &BackfillJob) -> Result<()> {
	let text = compose::embed_text(&job.label, &job.body);
	let vectors = state.provider.embed(&state.embedding, &[text]).await?;
	let vector =
		vectors.into_iter().next().ok_or_else(|| eyre::eyre!("Embedding response was empty."))?;

	if vector.len() != state.embedding.dimensions as usize {
		return Err(eyre::eyre!(
			"Embedding has {} dimensions, index requires {}.",
			vector.len(),
			state.embedding.dimensions
		));
	}

	let version = dowser_providers::embedding_version(&state.embedding);
	let stored =
		store_embedding(&state.db, job.entry_id, &vector, state.embedding.dimensions, &version)
			.await?;

	if !stored {
		tracing::info!(entry_id = %job.entry_id, "Entry vanished before backfill completed.");
	}

	Ok(())
}

fn backoff_for_attempt(attempt: i64) -> Duration {
	let exp = attempt.max(1).saturating_sub(1).min(6) as u32;
	let capped = BASE_BACKOFF_MS.saturating_mul(1 << exp).min(MAX_BACKOFF_MS);

	Duration::milliseconds(capped)
}

/// Outbox error text is operator-facing; strip anything that looks like a
/// credential and cap the length.
fn sanitize_job_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = "[REDACTED]".to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		for key in ["api_key", "apikey", "password", "secret", "token"] {
			if lowered.contains(key) && (lowered.contains('=') || lowered.contains(':')) {
				let sep = if raw.contains('=') { '=' } else { ':' };
				let prefix = raw.split(sep).next().unwrap_or(raw);

				word = format!("{prefix}{sep}[REDACTED]");

				break;
			}
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_JOB_ERROR_CHARS {
		out = out.chars().take(MAX_JOB_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}
