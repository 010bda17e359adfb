use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use dowser_service::{AnswerRequest, DegradedReason, Providers, SearchRequest, ServiceError};
use dowser_storage::quota::fetch_quota;
use dowser_testkit::{
	SpyEmbedding, SpyGeneration, StubEmbedding, StubGeneration, contact_jane_doe, test_config,
};

fn search_request(query: &str) -> SearchRequest {
	SearchRequest { tenant_id: "tenant-a".to_string(), query: query.to_string(), top_k: None }
}

fn answer_request(query: &str) -> AnswerRequest {
	AnswerRequest { tenant_id: "tenant-a".to_string(), query: query.to_string(), top_k: None }
}

#[tokio::test]
async fn exhausted_daily_limit_degrades_search_to_lexical() {
	let mut config = test_config(super::DIM);

	config.quota.daily_request_limit = 0;

	let embed_calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(SpyEmbedding { dimensions: super::DIM, calls: embed_calls.clone() }),
		Arc::new(StubGeneration { payload: "The evidence does not answer this.".to_string() }),
	);
	let (_test_db, service) = super::build_service(config, providers).await;

	super::seed(&service, "tenant-a", contact_jane_doe()).await;
	assert_eq!(embed_calls.load(Ordering::SeqCst), 1);

	let response = service
		.search(search_request("Jane Doe buyer"))
		.await
		.expect("Search should degrade, not fail.");

	assert!(response.degraded);
	assert_eq!(response.degraded_reason, Some(DegradedReason::Quota));
	assert!(!response.items.is_empty());
	// The query was never embedded once quota said no.
	assert_eq!(embed_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exhausted_daily_limit_rejects_answers() {
	let mut config = test_config(super::DIM);

	config.quota.daily_request_limit = 0;

	let gen_calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(StubEmbedding { dimensions: super::DIM }),
		Arc::new(SpyGeneration {
			calls: gen_calls.clone(),
			responses: vec!["Never reached.".to_string()],
		}),
	);
	let (_test_db, service) = super::build_service(config, providers).await;
	let err = service.answer(answer_request("What does Jane want?")).await.unwrap_err();

	assert!(matches!(err, ServiceError::RateLimited { .. }));
	assert_eq!(gen_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn daily_limit_admits_exactly_n_semantic_requests() {
	let mut config = test_config(super::DIM);

	config.quota.daily_request_limit = 2;

	let (_test_db, service) = super::build_service(config, super::stub_providers()).await;

	for expected in [None, None, Some(DegradedReason::Quota)] {
		let response = service
			.search(search_request("apartment listings"))
			.await
			.expect("Search failed.");

		assert_eq!(response.degraded_reason, expected);
	}
}

#[tokio::test]
async fn monthly_spend_cap_blocks_further_answers() {
	let mut config = test_config(super::DIM);

	config.quota.answer_cost_cents = 1_000;
	config.quota.default_monthly_cap_cents = 1_500;

	let (_test_db, service) = super::build_service(config, super::stub_providers()).await;

	// First answer fits under the cap; it refuses on empty evidence but is
	// still charged.
	service.answer(answer_request("What does Jane want?")).await.expect("First answer failed.");

	let err = service.answer(answer_request("What does Jane want?")).await.unwrap_err();
	let ServiceError::RateLimited { message } = err else {
		panic!("Expected RateLimited, got {err:?}.");
	};

	assert!(message.contains("Monthly spend cap"));

	let quota = fetch_quota(&service.db, "tenant-a")
		.await
		.expect("Failed to read quota.")
		.expect("Quota row missing.");

	assert_eq!(quota.monthly_spent_cents, 1_000);
}

#[tokio::test]
async fn concurrent_searches_never_exceed_the_limit() {
	let mut config = test_config(super::DIM);

	config.quota.daily_request_limit = 5;

	let (_test_db, service) = super::build_service(config, super::stub_providers()).await;
	let service = Arc::new(service);
	let mut handles = Vec::new();

	for _ in 0..16 {
		let service = service.clone();

		handles.push(tokio::spawn(async move {
			service.search(search_request("apartment listings")).await
		}));
	}

	let mut admitted: i64 = 0;

	for handle in handles {
		let response = handle.await.expect("Search task panicked.").expect("Search failed.");

		if response.degraded_reason.is_none() {
			admitted += 1;
		}
	}

	assert!(admitted <= 5);

	let quota = fetch_quota(&service.db, "tenant-a")
		.await
		.expect("Failed to read quota.")
		.expect("Quota row missing.");

	assert_eq!(quota.daily_used, admitted);
}

#[tokio::test]
async fn missing_quota_state_fails_closed() {
	let (_test_db, service) = super::stub_service().await;

	sqlx::query("DROP TABLE quota_state")
		.execute(&service.db.pool)
		.await
		.expect("Failed to drop the quota table.");

	let err = service.answer(answer_request("What does Jane want?")).await.unwrap_err();

	assert!(matches!(err, ServiceError::RateLimited { .. }));

	let response = service
		.search(search_request("Jane Doe buyer"))
		.await
		.expect("Search should degrade, not fail.");

	assert_eq!(response.degraded_reason, Some(DegradedReason::Quota));
}
