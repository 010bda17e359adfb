//! Shared fixtures for workspace tests: throwaway SQLite databases,
//! deterministic provider stubs and canned source entities.

use std::{
	collections::hash_map::DefaultHasher,
	hash::{Hash, Hasher},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};

use color_eyre::eyre;
use tempfile::TempDir;
use uuid::Uuid;

use dowser_config::{
	Config, EmbeddingProviderConfig, GenerationProviderConfig, Providers, Service, Sqlite, Storage,
};
use dowser_domain::compose::{
	ContactSource, EngagementSource, ProfessionalSource, SourceEntity, TaskSource,
	TransactionSource,
};
use dowser_service::{BoxFuture, EmbeddingProvider, GenerationProvider};
use dowser_storage::db::Db;

/// A schema-initialized SQLite database under a temporary directory. The
/// directory, and the database file with it, is removed on drop.
pub struct TestDb {
	pub db: Db,
	_dir: TempDir,
}

impl TestDb {
	pub async fn new() -> dowser_storage::Result<Self> {
		let dir = tempfile::tempdir()?;
		let path = dir.path().join("dowser-test.db");
		let cfg =
			Sqlite { path: path.to_string_lossy().into_owned(), pool_max_conns: 2 };
		let db = Db::connect(&cfg).await?;

		db.ensure_schema().await?;

		Ok(Self { db, _dir: dir })
	}

	/// Another handle on the same pool, for asserting on rows directly while
	/// a service owns the first one.
	pub fn db(&self) -> Db {
		Db { pool: self.db.pool.clone() }
	}
}

/// Deterministic embedding for tests: each term is hashed into a bucket and
/// counted. Terms come from the same tokenizer as the retrieval path, so
/// texts sharing words land near each other under cosine.
pub fn token_hash_vector(text: &str, dim: u32) -> Vec<f32> {
	let mut vector = vec![0.0_f32; dim as usize];

	for term in dowser_domain::text::query_terms(text) {
		let mut hasher = DefaultHasher::new();

		term.hash(&mut hasher);

		let bucket = (hasher.finish() % u64::from(dim)) as usize;

		vector[bucket] += 1.0;
	}

	vector
}

pub struct StubEmbedding {
	pub dimensions: u32,
}

impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let vectors =
			texts.iter().map(|text| token_hash_vector(text, self.dimensions)).collect::<Vec<_>>();

		Box::pin(async move { Ok(vectors) })
	}
}

/// [`StubEmbedding`] plus a call counter.
pub struct SpyEmbedding {
	pub dimensions: u32,
	pub calls: Arc<AtomicUsize>,
}

impl EmbeddingProvider for SpyEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let vectors =
			texts.iter().map(|text| token_hash_vector(text, self.dimensions)).collect::<Vec<_>>();

		Box::pin(async move { Ok(vectors) })
	}
}

pub struct FailingEmbedding;

impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async { Err(eyre::eyre!("Embedding provider unreachable.")) })
	}
}

/// Always answers with the same canned completion.
pub struct StubGeneration {
	pub payload: String,
}

impl GenerationProvider for StubGeneration {
	fn complete<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_system: &'a str,
		_user: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		let payload = self.payload.clone();

		Box::pin(async move { Ok(payload) })
	}
}

/// Scripted completions: call `n` answers with `responses[n]`, and the last
/// response repeats once the script runs out.
pub struct SpyGeneration {
	pub calls: Arc<AtomicUsize>,
	pub responses: Vec<String>,
}

impl GenerationProvider for SpyGeneration {
	fn complete<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_system: &'a str,
		_user: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		let index = self.calls.fetch_add(1, Ordering::SeqCst);
		let payload = self
			.responses
			.get(index.min(self.responses.len().saturating_sub(1)))
			.cloned()
			.expect("SpyGeneration needs at least one scripted response.");

		Box::pin(async move { Ok(payload) })
	}
}

pub struct FailingGeneration;

impl GenerationProvider for FailingGeneration {
	fn complete<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_system: &'a str,
		_user: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async { Err(eyre::eyre!("Generation provider unreachable.")) })
	}
}

/// A config wired for hermetic tests: loopback binds on port zero and
/// provider endpoints that refuse connections. Tests that touch storage
/// should swap `storage.sqlite.path` for a [`TestDb`] path, or hand the
/// [`TestDb`] pool to the service directly.
pub fn test_config(dimensions: u32) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			sqlite: Sqlite { path: "dowser-test.db".to_string(), pool_max_conns: 2 },
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test-embed".to_string(),
				dimensions,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
			generation: GenerationProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/chat/completions".to_string(),
				model: "test-chat".to_string(),
				temperature: 0.0,
				max_output_tokens: 512,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
		},
		search: Default::default(),
		ranking: Default::default(),
		quota: Default::default(),
		links: Default::default(),
		worker: Default::default(),
	}
}

pub fn contact_jane_doe() -> SourceEntity {
	SourceEntity::Contact(ContactSource {
		contact_id: Uuid::new_v4(),
		name: "Jane Doe".to_string(),
		tags: vec!["buyer".to_string()],
		notes: Some("Looking to buy this spring.".to_string()),
		preferences: Some("Wants a 2BR apartment near downtown.".to_string()),
	})
}

pub fn engagement_wants_2br(contact_id: Uuid) -> SourceEntity {
	SourceEntity::Engagement(EngagementSource {
		engagement_id: Uuid::new_v4(),
		contact_id: Some(contact_id),
		subject: "Apartment viewing with Jane Doe".to_string(),
		notes: Some("Jane confirmed she wants a 2BR apartment, budget $450k.".to_string()),
		transcript: None,
		summary: None,
		contact_name: Some("Jane Doe".to_string()),
		transaction_name: None,
	})
}

pub fn transaction_maple_listing() -> SourceEntity {
	SourceEntity::Transaction(TransactionSource {
		transaction_id: Uuid::new_v4(),
		address: "12 Maple Street".to_string(),
		status: "active".to_string(),
		notes: Some("Seller reviewing offers next week.".to_string()),
		party_names: vec!["Alice Vendor".to_string()],
	})
}

pub fn professional_home_inspector() -> SourceEntity {
	SourceEntity::Professional(ProfessionalSource {
		professional_id: Uuid::new_v4(),
		name: "Sam Carter".to_string(),
		category: "home inspector".to_string(),
		company: Some("Carter Inspections".to_string()),
		notes: Some("Fast turnaround on pre-sale reports.".to_string()),
	})
}

pub fn task_send_listings(contact_id: Uuid) -> SourceEntity {
	SourceEntity::Task(TaskSource {
		task_id: Uuid::new_v4(),
		contact_id: Some(contact_id),
		title: "Send Jane new 2BR listings".to_string(),
		notes: Some("Filter to downtown, under $450k.".to_string()),
		contact_name: Some("Jane Doe".to_string()),
		transaction_name: None,
	})
}
