use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

pub async fn embed(
	cfg: &dowser_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let mut last_error = None;

	for attempt in 1..=crate::MAX_ATTEMPTS {
		if attempt > 1 {
			tokio::time::sleep(crate::backoff_delay(attempt)).await;
		}

		let res = match client.post(&url).headers(headers.clone()).json(&body).send().await {
			Ok(res) => res,
			Err(err) => {
				last_error = Some(eyre::Report::from(err));

				continue;
			},
		};
		let status = res.status();

		if crate::is_transient(status) {
			tracing::warn!(%status, attempt, "Embedding provider returned a transient error.");

			last_error = Some(eyre::eyre!("Embedding provider returned {status}."));

			continue;
		}

		let json: Value = res.error_for_status()?.json().await?;

		return parse_embedding_response(json);
	}

	Err(last_error.unwrap_or_else(|| eyre::eyre!("Embedding provider did not respond.")))
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Embedding response is missing data array."))?;

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item
			.get("embedding")
			.and_then(|v| v.as_array())
			.ok_or_else(|| eyre::eyre!("Embedding item missing embedding array."))?;
		let mut vec = Vec::with_capacity(embedding.len());
		for value in embedding {
			let number =
				value.as_f64().ok_or_else(|| eyre::eyre!("Embedding value must be numeric."))?;
			vec.push(number as f32);
		}
		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}
