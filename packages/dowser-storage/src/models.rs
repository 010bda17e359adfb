use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// One indexed object. `embedding` stays raw here; decode with
/// [`crate::vector::blob_to_vec`] when scoring.
#[derive(Debug, sqlx::FromRow)]
pub struct IndexEntry {
	pub entry_id: Uuid,
	pub tenant_id: String,
	pub object_type: String,
	pub object_id: Uuid,
	pub label: String,
	pub body: String,
	pub text_hash: String,
	pub owning_contact_id: Option<Uuid>,
	pub embedding: Option<Vec<u8>>,
	pub embedding_version: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// A text-search hit; `score` is the negated bm25 rank so higher is better.
#[derive(Debug, sqlx::FromRow)]
pub struct LexicalHit {
	pub object_type: String,
	pub object_id: Uuid,
	pub label: String,
	pub owning_contact_id: Option<Uuid>,
	pub updated_at: OffsetDateTime,
	pub score: f64,
	pub snippet: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SemanticRow {
	pub object_type: String,
	pub object_id: Uuid,
	pub label: String,
	pub owning_contact_id: Option<Uuid>,
	pub embedding: Vec<u8>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuotaRow {
	pub tenant_id: String,
	pub daily_used: i64,
	pub daily_reset_on: Date,
	pub monthly_spent_cents: i64,
	pub monthly_cap_cents: Option<i64>,
	pub monthly_reset_on: Date,
	pub version: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct EmbedOutboxEntry {
	pub outbox_id: Uuid,
	pub tenant_id: String,
	pub entry_id: Uuid,
	pub status: String,
	pub attempts: i64,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub claimed_until: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// A claimed backfill job joined with the entry text it must embed.
#[derive(Debug, sqlx::FromRow)]
pub struct BackfillJob {
	pub outbox_id: Uuid,
	pub entry_id: Uuid,
	pub tenant_id: String,
	pub attempts: i64,
	pub label: String,
	pub body: String,
}
