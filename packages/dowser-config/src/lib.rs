mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, GenerationProviderConfig, Links, Providers, Quota, Ranking,
	Search, Service, Sqlite, Storage, Worker,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.sqlite.path.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.sqlite.path must be non-empty.".to_string(),
		});
	}
	if cfg.storage.sqlite.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.sqlite.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.generation.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.generation.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.generation.max_output_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.generation.max_output_tokens must be greater than zero."
				.to_string(),
		});
	}

	for (label, value) in [
		("embedding", &cfg.providers.embedding.api_base),
		("generation", &cfg.providers.generation.api_base),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_base must be non-empty."),
			});
		}
	}
	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("generation", &cfg.providers.generation.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}
	for (label, model) in [
		("embedding", &cfg.providers.embedding.model),
		("generation", &cfg.providers.generation.model),
	] {
		if model.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} model must be non-empty."),
			});
		}
	}

	if cfg.search.default_top_k == 0 {
		return Err(Error::Validation {
			message: "search.default_top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_top_k < cfg.search.default_top_k {
		return Err(Error::Validation {
			message: "search.max_top_k must be at least search.default_top_k.".to_string(),
		});
	}
	if cfg.search.candidate_k == 0 {
		return Err(Error::Validation {
			message: "search.candidate_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.semantic_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.semantic_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.search.deadline_ms <= cfg.search.semantic_timeout_ms {
		return Err(Error::Validation {
			message: "search.deadline_ms must be greater than search.semantic_timeout_ms."
				.to_string(),
		});
	}

	for (label, weight) in [
		("ranking.lexical_weight", cfg.ranking.lexical_weight),
		("ranking.semantic_weight", cfg.ranking.semantic_weight),
		("ranking.dual_source_bonus", cfg.ranking.dual_source_bonus),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if weight < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}
	if cfg.ranking.lexical_weight + cfg.ranking.semantic_weight <= 0.0 {
		return Err(Error::Validation {
			message: "ranking.lexical_weight and ranking.semantic_weight must not both be zero."
				.to_string(),
		});
	}
	if !cfg.ranking.similarity_floor.is_finite()
		|| !(0.0..=1.0).contains(&cfg.ranking.similarity_floor)
	{
		return Err(Error::Validation {
			message: "ranking.similarity_floor must be within [0, 1].".to_string(),
		});
	}
	if !cfg.ranking.label_weight.is_finite() || cfg.ranking.label_weight <= 0.0 {
		return Err(Error::Validation {
			message: "ranking.label_weight must be greater than zero.".to_string(),
		});
	}
	if !cfg.ranking.body_weight.is_finite() || cfg.ranking.body_weight <= 0.0 {
		return Err(Error::Validation {
			message: "ranking.body_weight must be greater than zero.".to_string(),
		});
	}

	if cfg.quota.daily_request_limit < 0 {
		return Err(Error::Validation {
			message: "quota.daily_request_limit must be zero or greater.".to_string(),
		});
	}
	if cfg.quota.answer_cost_cents < 0 {
		return Err(Error::Validation {
			message: "quota.answer_cost_cents must be zero or greater.".to_string(),
		});
	}
	if cfg.quota.default_monthly_cap_cents < 0 {
		return Err(Error::Validation {
			message: "quota.default_monthly_cap_cents must be zero or greater.".to_string(),
		});
	}
	if !(-1_440..=1_440).contains(&cfg.quota.utc_offset_minutes) {
		return Err(Error::Validation {
			message: "quota.utc_offset_minutes must be within [-1440, 1440].".to_string(),
		});
	}

	if cfg.links.base_url.trim().is_empty() {
		return Err(Error::Validation { message: "links.base_url must be non-empty.".to_string() });
	}

	if cfg.worker.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "worker.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.batch_size == 0 {
		return Err(Error::Validation {
			message: "worker.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.max_attempts <= 0 {
		return Err(Error::Validation {
			message: "worker.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.claim_lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_lowercase();

	while cfg.links.base_url.ends_with('/') {
		cfg.links.base_url.pop();
	}
}
