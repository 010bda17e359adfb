use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// One chat-completion round trip. The caller owns prompt construction; this
/// returns the raw assistant text, citation markers included.
pub async fn complete(
	cfg: &dowser_config::GenerationProviderConfig,
	system: &str,
	user: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_output_tokens,
		"messages": [
			{ "role": "system", "content": system },
			{ "role": "user", "content": user },
		],
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
			tracing::warn!(%status, attempt, "Generation provider returned a transient error.");

			last_error = Some(eyre::eyre!("Generation provider returned {status}."));

			continue;
		}

		let json: Value = res.error_for_status()?.json().await?;

		return parse_generation_response(json);
	}

	Err(last_error.unwrap_or_else(|| eyre::eyre!("Generation provider did not respond.")))
}

fn parse_generation_response(json: Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| eyre::eyre!("Generation response is missing message content."))?;

	Ok(content.to_string())
}
