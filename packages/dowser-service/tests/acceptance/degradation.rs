use std::{sync::Arc, time::Duration};

use dowser_domain::fusion::RetrievalSource;
use dowser_service::{
	BoxFuture, DegradedReason, EmbeddingProvider, Providers, SearchRequest, UpsertRequest,
};
use dowser_storage::outbox::pending_count;
use dowser_testkit::{
	FailingEmbedding, StubGeneration, contact_jane_doe, test_config, token_hash_vector,
};

/// Embeds correctly, but slower than any sane semantic timeout.
struct SlowEmbedding;

impl EmbeddingProvider for SlowEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a dowser_config::EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async {
			tokio::time::sleep(Duration::from_millis(200)).await;

			Ok(texts.iter().map(|text| token_hash_vector(text, super::DIM)).collect())
		})
	}
}

fn stub_generation() -> Arc<StubGeneration> {
	Arc::new(StubGeneration { payload: "The evidence does not answer this.".to_string() })
}

#[tokio::test]
async fn failing_embedder_defers_and_serves_lexical() {
	let providers = Providers::new(Arc::new(FailingEmbedding), stub_generation());
	let (_test_db, service) = super::build_service(test_config(super::DIM), providers).await;
	let entity = contact_jane_doe();
	let contact_id = entity.object_id();
	let upserted = service
		.upsert(UpsertRequest { tenant_id: "tenant-a".to_string(), entity })
		.await
		.expect("Upsert should defer the vector, not fail.");

	assert!(!upserted.embedded);
	assert_eq!(
		pending_count(&service.db, "tenant-a").await.expect("Failed to count pending jobs."),
		1,
	);

	let response = service
		.search(SearchRequest {
			tenant_id: "tenant-a".to_string(),
			query: "Jane Doe buyer".to_string(),
			top_k: None,
		})
		.await
		.expect("Search should degrade, not fail.");

	assert!(response.degraded);
	assert_eq!(response.degraded_reason, Some(DegradedReason::SemanticUnavailable));

	let item = response
		.items
		.iter()
		.find(|item| item.object_id == contact_id)
		.expect("Contact missing from the lexical results.");

	assert_eq!(item.sources, vec![RetrievalSource::Lexical]);
}

#[tokio::test]
async fn slow_embedder_times_out_and_degrades() {
	let mut config = test_config(super::DIM);

	config.search.semantic_timeout_ms = 50;

	let providers = Providers::new(Arc::new(SlowEmbedding), stub_generation());
	let (_test_db, service) = super::build_service(config, providers).await;
	let contact_id = super::seed(&service, "tenant-a", contact_jane_doe()).await;
	let response = service
		.search(SearchRequest {
			tenant_id: "tenant-a".to_string(),
			query: "Jane Doe buyer".to_string(),
			top_k: None,
		})
		.await
		.expect("Search should degrade, not fail.");

	assert_eq!(response.degraded_reason, Some(DegradedReason::SemanticUnavailable));

	let item = response
		.items
		.iter()
		.find(|item| item.object_id == contact_id)
		.expect("Contact missing from the lexical results.");

	assert_eq!(item.sources, vec![RetrievalSource::Lexical]);
}
