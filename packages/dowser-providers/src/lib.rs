pub mod embedding;
pub mod generation;

use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 250;

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header values must be strings."));
		};
		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}
	Ok(headers)
}

/// Version tag stored next to each vector.
///
/// Vectors written under a different provider, model or dimension count are
/// unusable for similarity search against fresh query embeddings, so the tag
/// encodes all three.
pub fn embedding_version(cfg: &dowser_config::EmbeddingProviderConfig) -> String {
	format!("{}:{}:{}", cfg.provider_id, cfg.model, cfg.dimensions)
}

fn backoff_delay(attempt: u32) -> Duration {
	Duration::from_millis(BASE_BACKOFF_MS << attempt.saturating_sub(2).min(4))
}

/// Transient upstream responses are retried; other client errors fail fast.
fn is_transient(status: reqwest::StatusCode) -> bool {
	status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
