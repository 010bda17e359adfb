/// Statements are split on `;`, so none of them may contain one internally.
/// FTS maintenance is explicit in the write paths rather than trigger-based,
/// which keeps that constraint easy to honor.
pub const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS search_index (
	entry_id BLOB PRIMARY KEY,
	tenant_id TEXT NOT NULL,
	object_type TEXT NOT NULL,
	object_id BLOB NOT NULL,
	label TEXT NOT NULL,
	body TEXT NOT NULL,
	text_hash TEXT NOT NULL,
	owning_contact_id BLOB,
	embedding BLOB,
	embedding_version TEXT NOT NULL,
	created_at TEXT NOT NULL,
	updated_at TEXT NOT NULL,
	UNIQUE (tenant_id, object_type, object_id)
);
CREATE INDEX IF NOT EXISTS idx_search_index_tenant_updated
	ON search_index (tenant_id, updated_at DESC);
CREATE INDEX IF NOT EXISTS idx_search_index_tenant_version
	ON search_index (tenant_id, embedding_version);
CREATE TABLE IF NOT EXISTS quota_state (
	tenant_id TEXT PRIMARY KEY,
	daily_used INTEGER NOT NULL,
	daily_reset_on TEXT NOT NULL,
	monthly_spent_cents INTEGER NOT NULL,
	monthly_cap_cents INTEGER,
	monthly_reset_on TEXT NOT NULL,
	version INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS embed_outbox (
	outbox_id BLOB PRIMARY KEY,
	tenant_id TEXT NOT NULL,
	entry_id BLOB NOT NULL,
	status TEXT NOT NULL DEFAULT 'PENDING',
	attempts INTEGER NOT NULL DEFAULT 0,
	last_error TEXT,
	available_at TEXT NOT NULL,
	claimed_until TEXT,
	created_at TEXT NOT NULL,
	updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_embed_outbox_due
	ON embed_outbox (status, available_at);
CREATE INDEX IF NOT EXISTS idx_embed_outbox_entry
	ON embed_outbox (entry_id)";

/// `CREATE VIRTUAL TABLE` has no reliable `IF NOT EXISTS` across FTS5
/// builds, so creation is guarded by a sqlite_master lookup.
pub const FTS_TABLE: &str = "search_fts";

pub const FTS_CREATE: &str = "\
CREATE VIRTUAL TABLE search_fts USING fts5(
	entry_id UNINDEXED,
	tenant_id UNINDEXED,
	label,
	body
)";
