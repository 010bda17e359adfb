use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{IndexEntry, LexicalHit, SemanticRow},
	vector,
};

pub struct UpsertEntryArgs<'a> {
	pub entry_id: Uuid,
	pub tenant_id: &'a str,
	pub object_type: &'a str,
	pub object_id: Uuid,
	pub label: &'a str,
	pub body: &'a str,
	pub text_hash: &'a str,
	pub owning_contact_id: Option<Uuid>,
	pub embedding: Option<&'a [f32]>,
	pub embedding_dim: u32,
	pub embedding_version: &'a str,
	pub updated_at: OffsetDateTime,
	/// Queue the entry for background embedding when no vector is stored.
	pub enqueue_backfill: bool,
}

/// Writes the entry row and its FTS row in one transaction, so lexical search
/// never sees an orphan on either side. Returns the entry id (existing row's
/// id on update).
pub async fn upsert_entry(db: &Db, args: UpsertEntryArgs<'_>) -> Result<Uuid> {
	let embedding_blob = match args.embedding {
		Some(vec) => {
			if vec.len() != args.embedding_dim as usize {
				return Err(Error::IndexIntegrity(format!(
					"embedding has {} dimensions, index requires {}",
					vec.len(),
					args.embedding_dim,
				)));
			}

			Some(vector::vec_to_blob(vec))
		},
		None => None,
	};
	let mut tx = db.pool.begin().await?;
	let existing: Option<(Uuid,)> = sqlx::query_as(
		"\
SELECT entry_id
FROM search_index
WHERE tenant_id = ?1 AND object_type = ?2 AND object_id = ?3",
	)
	.bind(args.tenant_id)
	.bind(args.object_type)
	.bind(args.object_id)
	.fetch_optional(&mut *tx)
	.await?;
	let entry_id = match existing {
		Some((entry_id,)) => {
			sqlx::query(
				"\
UPDATE search_index
SET label = ?2,
	body = ?3,
	text_hash = ?4,
	owning_contact_id = ?5,
	embedding = ?6,
	embedding_version = ?7,
	updated_at = ?8
WHERE entry_id = ?1",
			)
			.bind(entry_id)
			.bind(args.label)
			.bind(args.body)
			.bind(args.text_hash)
			.bind(args.owning_contact_id)
			.bind(embedding_blob.as_deref())
			.bind(args.embedding_version)
			.bind(args.updated_at)
			.execute(&mut *tx)
			.await?;
			sqlx::query("DELETE FROM search_fts WHERE entry_id = ?1")
				.bind(entry_id)
				.execute(&mut *tx)
				.await?;

			entry_id
		},
		None => {
			sqlx::query(
				"\
INSERT INTO search_index (
	entry_id, tenant_id, object_type, object_id, label, body, text_hash,
	owning_contact_id, embedding, embedding_version, created_at, updated_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
			)
			.bind(args.entry_id)
			.bind(args.tenant_id)
			.bind(args.object_type)
			.bind(args.object_id)
			.bind(args.label)
			.bind(args.body)
			.bind(args.text_hash)
			.bind(args.owning_contact_id)
			.bind(embedding_blob.as_deref())
			.bind(args.embedding_version)
			.bind(args.updated_at)
			.execute(&mut *tx)
			.await?;

			args.entry_id
		},
	};

	sqlx::query(
		"INSERT INTO search_fts (entry_id, tenant_id, label, body) VALUES (?1, ?2, ?3, ?4)",
	)
	.bind(entry_id)
	.bind(args.tenant_id)
	.bind(args.label)
	.bind(args.body)
	.execute(&mut *tx)
	.await?;

	if embedding_blob.is_some() {
		// A stored vector supersedes any queued backfill for this entry.
		sqlx::query("DELETE FROM embed_outbox WHERE entry_id = ?1 AND status = 'PENDING'")
			.bind(entry_id)
			.execute(&mut *tx)
			.await?;
	} else if args.enqueue_backfill {
		sqlx::query("DELETE FROM embed_outbox WHERE entry_id = ?1 AND status = 'PENDING'")
			.bind(entry_id)
			.execute(&mut *tx)
			.await?;
		sqlx::query(
			"\
INSERT INTO embed_outbox (outbox_id, tenant_id, entry_id, status, attempts, available_at, created_at, updated_at)
VALUES (?1, ?2, ?3, 'PENDING', 0, ?4, ?4, ?4)",
		)
		.bind(Uuid::new_v4())
		.bind(args.tenant_id)
		.bind(entry_id)
		.bind(args.updated_at)
		.execute(&mut *tx)
		.await?;
	}

	tx.commit().await?;

	Ok(entry_id)
}

/// Refreshes `updated_at` without rewriting text or vector; used when an
/// upsert recomputed identical content.
pub async fn touch_entry(db: &Db, entry_id: Uuid, updated_at: OffsetDateTime) -> Result<()> {
	sqlx::query("UPDATE search_index SET updated_at = ?2 WHERE entry_id = ?1")
		.bind(entry_id)
		.bind(updated_at)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn fetch_entry(
	db: &Db,
	tenant_id: &str,
	object_type: &str,
	object_id: Uuid,
) -> Result<Option<IndexEntry>> {
	let entry = sqlx::query_as(
		"\
SELECT *
FROM search_index
WHERE tenant_id = ?1 AND object_type = ?2 AND object_id = ?3",
	)
	.bind(tenant_id)
	.bind(object_type)
	.bind(object_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(entry)
}

/// Deletes the entry, its FTS row, and any queued backfill in one
/// transaction. Removing an absent entry is a no-op.
pub async fn remove_entry(
	db: &Db,
	tenant_id: &str,
	object_type: &str,
	object_id: Uuid,
) -> Result<bool> {
	let mut tx = db.pool.begin().await?;
	let existing: Option<(Uuid,)> = sqlx::query_as(
		"\
SELECT entry_id
FROM search_index
WHERE tenant_id = ?1 AND object_type = ?2 AND object_id = ?3",
	)
	.bind(tenant_id)
	.bind(object_type)
	.bind(object_id)
	.fetch_optional(&mut *tx)
	.await?;
	let Some((entry_id,)) = existing else {
		tx.commit().await?;

		return Ok(false);
	};

	sqlx::query("DELETE FROM search_fts WHERE entry_id = ?1")
		.bind(entry_id)
		.execute(&mut *tx)
		.await?;
	sqlx::query("DELETE FROM embed_outbox WHERE entry_id = ?1")
		.bind(entry_id)
		.execute(&mut *tx)
		.await?;
	sqlx::query("DELETE FROM search_index WHERE entry_id = ?1")
		.bind(entry_id)
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	Ok(true)
}

/// Ranked text search through the store's FTS5 parser. The tenant filter is
/// the first predicate; label hits outrank body hits via the bm25 column
/// weights; recency breaks rank ties.
pub async fn lexical_search(
	db: &Db,
	tenant_id: &str,
	match_expression: &str,
	label_weight: f64,
	body_weight: f64,
	limit: u32,
) -> Result<Vec<LexicalHit>> {
	let hits = sqlx::query_as(
		"\
SELECT i.object_type,
	i.object_id,
	i.label,
	i.owning_contact_id,
	i.updated_at,
	-bm25(search_fts, 0.0, 0.0, ?3, ?4) AS score,
	snippet(search_fts, 3, '[', ']', '\u{2026}', 40) AS snippet
FROM search_fts
JOIN search_index i ON i.entry_id = search_fts.entry_id
WHERE search_fts.tenant_id = ?1 AND search_fts MATCH ?2
ORDER BY score DESC, i.updated_at DESC
LIMIT ?5",
	)
	.bind(tenant_id)
	.bind(match_expression)
	.bind(label_weight)
	.bind(body_weight)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(hits)
}

/// Rows eligible for semantic scoring: tenant-scoped, vector present, and
/// written under the current embedding version. Stale or missing vectors are
/// lexical-only until the backfill catches up.
pub async fn semantic_rows(
	db: &Db,
	tenant_id: &str,
	embedding_version: &str,
) -> Result<Vec<SemanticRow>> {
	let rows = sqlx::query_as(
		"\
SELECT object_type, object_id, label, owning_contact_id, embedding
FROM search_index
WHERE tenant_id = ?1 AND embedding IS NOT NULL AND embedding_version = ?2",
	)
	.bind(tenant_id)
	.bind(embedding_version)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Current (object_type, object_id) pairs for a tenant; the rebuild pass
/// uses this to drop entries whose source object no longer exists.
pub async fn list_object_refs(db: &Db, tenant_id: &str) -> Result<Vec<(String, Uuid)>> {
	let refs = sqlx::query_as(
		"\
SELECT object_type, object_id
FROM search_index
WHERE tenant_id = ?1",
	)
	.bind(tenant_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(refs)
}

/// Stores a backfilled vector. Returns false when the entry vanished while
/// the job was in flight.
pub async fn store_embedding(
	db: &Db,
	entry_id: Uuid,
	embedding: &[f32],
	embedding_dim: u32,
	embedding_version: &str,
) -> Result<bool> {
	if embedding.len() != embedding_dim as usize {
		return Err(Error::IndexIntegrity(format!(
			"embedding has {} dimensions, index requires {}",
			embedding.len(),
			embedding_dim,
		)));
	}

	let result = sqlx::query(
		"\
UPDATE search_index
SET embedding = ?2,
	embedding_version = ?3
WHERE entry_id = ?1",
	)
	.bind(entry_id)
	.bind(vector::vec_to_blob(embedding))
	.bind(embedding_version)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}
