use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub quota: Quota,
	#[serde(default)]
	pub links: Links,
	#[serde(default)]
	pub worker: Worker,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub sqlite: Sqlite,
}

#[derive(Debug, Deserialize)]
pub struct Sqlite {
	pub path: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub generation: GenerationProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct GenerationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_output_tokens: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_top_k: u32,
	pub max_top_k: u32,
	pub candidate_k: u32,
	pub semantic_timeout_ms: u64,
	pub deadline_ms: u64,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_top_k: 10,
			max_top_k: 50,
			candidate_k: 40,
			semantic_timeout_ms: 2_500,
			deadline_ms: 10_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub lexical_weight: f32,
	pub semantic_weight: f32,
	pub dual_source_bonus: f32,
	pub similarity_floor: f32,
	pub label_weight: f64,
	pub body_weight: f64,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			lexical_weight: 0.55,
			semantic_weight: 0.45,
			dual_source_bonus: 0.1,
			similarity_floor: 0.4,
			label_weight: 4.0,
			body_weight: 1.0,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Quota {
	pub daily_request_limit: i64,
	pub answer_cost_cents: i64,
	/// Seeds a tenant's first quota row. Zero means uncapped.
	pub default_monthly_cap_cents: i64,
	pub utc_offset_minutes: i32,
}
impl Default for Quota {
	fn default() -> Self {
		Self {
			daily_request_limit: 200,
			answer_cost_cents: 2,
			default_monthly_cap_cents: 1_000,
			utc_offset_minutes: 0,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Links {
	pub base_url: String,
}
impl Default for Links {
	fn default() -> Self {
		Self { base_url: "https://app.example.com".to_string() }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Worker {
	pub poll_interval_ms: u64,
	pub batch_size: u32,
	pub max_attempts: i32,
	pub claim_lease_seconds: i64,
}
impl Default for Worker {
	fn default() -> Self {
		Self { poll_interval_ms: 500, batch_size: 16, max_attempts: 5, claim_lease_seconds: 30 }
	}
}
