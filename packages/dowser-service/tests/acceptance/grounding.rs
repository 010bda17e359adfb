use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use uuid::Uuid;

use dowser_domain::{
	compose::ObjectType,
	grounding::{Citation, Confidence, REFUSAL_ANSWER},
};
use dowser_service::{AnswerRequest, Providers, ServiceError};
use dowser_storage::quota::fetch_quota;
use dowser_testkit::{
	FailingGeneration, SpyGeneration, StubEmbedding, contact_jane_doe, test_config,
};

fn answer_request(query: &str) -> AnswerRequest {
	AnswerRequest { tenant_id: "tenant-a".to_string(), query: query.to_string(), top_k: None }
}

fn spy_generation(responses: Vec<String>) -> (Arc<AtomicUsize>, Arc<SpyGeneration>) {
	let calls = Arc::new(AtomicUsize::new(0));
	let spy = Arc::new(SpyGeneration { calls: calls.clone(), responses });

	(calls, spy)
}

#[tokio::test]
async fn grounded_answer_cites_indexed_evidence() {
	let entity = contact_jane_doe();
	let contact_id = entity.object_id();
	let (calls, spy) = spy_generation(vec![format!(
		"Jane is after a 2BR apartment near downtown [contact:{contact_id}]."
	)]);
	let providers = Providers::new(Arc::new(StubEmbedding { dimensions: super::DIM }), spy);
	let (_test_db, service) = super::build_service(test_config(super::DIM), providers).await;

	super::seed(&service, "tenant-a", entity).await;

	let result = service
		.answer(answer_request("What is Jane looking to buy this spring?"))
		.await
		.expect("Answer failed.");

	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(
		result.citations,
		vec![Citation { object_type: ObjectType::Contact, object_id: contact_id }],
	);
	assert_eq!(result.confidence, Confidence::Medium);
	assert!(result.evidence_strength > 0.0);
	assert!(result.answer.contains("2BR apartment"));
}

#[tokio::test]
async fn corrective_reprompt_recovers_a_violating_answer() {
	let entity = contact_jane_doe();
	let contact_id = entity.object_id();
	let foreign = Uuid::new_v4();
	let (calls, spy) = spy_generation(vec![
		format!("Jane wants a 2BR apartment [contact:{foreign}]."),
		format!("Jane wants a 2BR apartment [contact:{contact_id}]."),
	]);
	let providers = Providers::new(Arc::new(StubEmbedding { dimensions: super::DIM }), spy);
	let (_test_db, service) = super::build_service(test_config(super::DIM), providers).await;

	super::seed(&service, "tenant-a", entity).await;

	let result = service
		.answer(answer_request("What is Jane looking to buy this spring?"))
		.await
		.expect("Answer failed.");

	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert_ne!(result.answer, REFUSAL_ANSWER);
	assert_eq!(
		result.citations,
		vec![Citation { object_type: ObjectType::Contact, object_id: contact_id }],
	);
}

#[tokio::test]
async fn foreign_citation_is_refused_after_one_reprompt() {
	let foreign = Uuid::new_v4();
	let (calls, spy) =
		spy_generation(vec![format!("Jane wants a condo downtown [contact:{foreign}].")]);
	let providers = Providers::new(Arc::new(StubEmbedding { dimensions: super::DIM }), spy);
	let (_test_db, service) = super::build_service(test_config(super::DIM), providers).await;

	super::seed(&service, "tenant-a", contact_jane_doe()).await;

	let result = service
		.answer(answer_request("What is Jane looking to buy this spring?"))
		.await
		.expect("Answer failed.");

	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert_eq!(result.answer, REFUSAL_ANSWER);
	assert!(result.citations.is_empty());
	assert_eq!(result.confidence, Confidence::Low);
	assert_eq!(result.evidence_strength, 0.0);
}

#[tokio::test]
async fn uncited_answer_is_refused() {
	let (calls, spy) =
		spy_generation(vec!["Jane wants to buy an apartment this spring.".to_string()]);
	let providers = Providers::new(Arc::new(StubEmbedding { dimensions: super::DIM }), spy);
	let (_test_db, service) = super::build_service(test_config(super::DIM), providers).await;

	super::seed(&service, "tenant-a", contact_jane_doe()).await;

	let result = service
		.answer(answer_request("What is Jane looking to buy this spring?"))
		.await
		.expect("Answer failed.");

	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert_eq!(result.answer, REFUSAL_ANSWER);
}

#[tokio::test]
async fn empty_evidence_refuses_without_calling_generation() {
	let (calls, spy) = spy_generation(vec!["Never reached.".to_string()]);
	let providers = Providers::new(Arc::new(StubEmbedding { dimensions: super::DIM }), spy);
	let (_test_db, service) = super::build_service(test_config(super::DIM), providers).await;
	let result = service
		.answer(answer_request("Anything about Jane?"))
		.await
		.expect("Answer failed.");

	assert_eq!(result.answer, REFUSAL_ANSWER);
	assert_eq!(calls.load(Ordering::SeqCst), 0);

	let quota = fetch_quota(&service.db, "tenant-a")
		.await
		.expect("Failed to read quota.")
		.expect("Quota row missing.");

	// A refusal still costs the tenant the request it admitted.
	assert_eq!(quota.daily_used, 1);
}

#[tokio::test]
async fn generation_failure_maps_to_upstream() {
	let providers = Providers::new(
		Arc::new(StubEmbedding { dimensions: super::DIM }),
		Arc::new(FailingGeneration),
	);
	let (_test_db, service) = super::build_service(test_config(super::DIM), providers).await;

	super::seed(&service, "tenant-a", contact_jane_doe()).await;

	let err = service
		.answer(answer_request("What is Jane looking to buy this spring?"))
		.await
		.unwrap_err();

	assert!(matches!(err, ServiceError::Upstream { .. }));
}
