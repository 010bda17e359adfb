use dowser_domain::{compose::ObjectType, fusion::RetrievalSource};
use dowser_service::{SearchRequest, ServiceError};
use dowser_testkit::{contact_jane_doe, engagement_wants_2br, task_send_listings};

fn request(tenant_id: &str, query: &str, top_k: Option<u32>) -> SearchRequest {
	SearchRequest { tenant_id: tenant_id.to_string(), query: query.to_string(), top_k }
}

#[tokio::test]
async fn finds_matching_entities_across_sources() {
	let (_test_db, service) = super::stub_service().await;
	let contact_id = super::seed(&service, "tenant-a", contact_jane_doe()).await;
	let engagement_id = super::seed(&service, "tenant-a", engagement_wants_2br(contact_id)).await;
	let response = service
		.search(request("tenant-a", "2BR apartment Jane", None))
		.await
		.expect("Search failed.");

	assert!(!response.degraded);
	assert_eq!(response.degraded_reason, None);
	assert_eq!(response.items.len(), 2);
	assert_eq!(response.items.iter().filter(|item| item.object_id == contact_id).count(), 1);
	assert_eq!(response.items.iter().filter(|item| item.object_id == engagement_id).count(), 1);

	let engagement = response
		.items
		.iter()
		.find(|item| item.object_id == engagement_id)
		.expect("Engagement missing from the results.");

	assert_eq!(engagement.object_type, ObjectType::Engagement);
	assert_eq!(
		engagement.deep_link,
		format!("https://app.example.com/contacts/{contact_id}/engagements/{engagement_id}"),
	);
}

#[tokio::test]
async fn dual_source_match_reports_both_sources() {
	let (_test_db, service) = super::stub_service().await;
	let contact_id = super::seed(&service, "tenant-a", contact_jane_doe()).await;
	let response = service
		.search(request("tenant-a", "Jane Doe buyer looking to buy this spring", None))
		.await
		.expect("Search failed.");
	let item = response
		.items
		.iter()
		.find(|item| item.object_id == contact_id)
		.expect("Contact missing from the results.");

	assert_eq!(item.sources, vec![RetrievalSource::Lexical, RetrievalSource::Semantic]);
	assert!(item.snippet.is_some());
	// Sole hit in both sources: full weights plus the dual-source bonus.
	assert!((item.score - 1.1).abs() < 1e-6);
}

#[tokio::test]
async fn respects_and_caps_top_k() {
	let (_test_db, service) = super::stub_service().await;
	let contact_id = super::seed(&service, "tenant-a", contact_jane_doe()).await;

	super::seed(&service, "tenant-a", engagement_wants_2br(contact_id)).await;
	super::seed(&service, "tenant-a", task_send_listings(contact_id)).await;

	let response = service
		.search(request("tenant-a", "Jane", Some(2)))
		.await
		.expect("Search failed.");

	assert_eq!(response.items.len(), 2);

	let response = service
		.search(request("tenant-a", "Jane", Some(500)))
		.await
		.expect("Oversized top_k should clamp, not fail.");

	assert_eq!(response.items.len(), 3);

	let err = service.search(request("tenant-a", "Jane", Some(0))).await.unwrap_err();

	assert!(matches!(err, ServiceError::InvalidRequest { .. }));
}

#[tokio::test]
async fn empty_index_yields_no_items() {
	let (_test_db, service) = super::stub_service().await;
	let response = service
		.search(request("tenant-a", "anything at all", None))
		.await
		.expect("Search failed.");

	assert!(response.items.is_empty());
	assert!(!response.degraded);
}

#[tokio::test]
async fn punctuation_only_query_yields_no_items() {
	let (_test_db, service) = super::stub_service().await;

	super::seed(&service, "tenant-a", contact_jane_doe()).await;

	let response = service
		.search(request("tenant-a", "?? !! ...", None))
		.await
		.expect("Search failed.");

	assert!(response.items.is_empty());
	assert!(!response.degraded);
}

#[tokio::test]
async fn rejects_blank_tenant_and_query() {
	let (_test_db, service) = super::stub_service().await;
	let err = service.search(request("  ", "jane", None)).await.unwrap_err();

	assert!(matches!(err, ServiceError::InvalidRequest { .. }));

	let err = service.search(request("tenant-a", "   ", None)).await.unwrap_err();

	assert!(matches!(err, ServiceError::InvalidRequest { .. }));
}
