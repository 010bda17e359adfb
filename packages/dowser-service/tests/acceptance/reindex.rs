use std::sync::Arc;

use uuid::Uuid;

use dowser_domain::compose::{ContactSource, SourceEntity};
use dowser_service::{Providers, ReindexRequest, UpsertRequest};
use dowser_storage::{index::fetch_entry, outbox::pending_count};
use dowser_testkit::{
	FailingEmbedding, StubGeneration, contact_jane_doe, engagement_wants_2br, test_config,
	transaction_maple_listing,
};

fn reindex_request() -> ReindexRequest {
	ReindexRequest { tenant_id: "tenant-a".to_string() }
}

#[tokio::test]
async fn reindex_is_idempotent() {
	let (_test_db, service) = super::stub_service().await;
	let contact = contact_jane_doe();
	let contact_id = contact.object_id();
	let entities = vec![contact.clone(), engagement_wants_2br(contact_id)];
	let first = service
		.rebuild_all(&entities, reindex_request())
		.await
		.expect("First reindex failed.");

	assert_eq!(first.rebuilt_count, 2);
	assert_eq!(first.embedded_count, 2);
	assert_eq!(first.deferred_count, 0);
	assert_eq!(first.error_count, 0);

	let before = fetch_entry(&service.db, "tenant-a", "contact", contact_id)
		.await
		.expect("Failed to fetch entry.")
		.expect("Contact entry missing.");
	let second = service
		.rebuild_all(&entities, reindex_request())
		.await
		.expect("Second reindex failed.");

	assert_eq!(second.rebuilt_count, 2);
	assert_eq!(second.embedded_count, 2);

	let after = fetch_entry(&service.db, "tenant-a", "contact", contact_id)
		.await
		.expect("Failed to fetch entry.")
		.expect("Contact entry missing.");

	assert_eq!(after.text_hash, before.text_hash);
	assert_eq!(after.entry_id, before.entry_id);
	assert!(after.embedding.is_some());
}

#[tokio::test]
async fn reindex_reembeds_changed_entities() {
	let (_test_db, service) = super::stub_service().await;
	let mut entities = vec![contact_jane_doe()];
	let contact_id = entities[0].object_id();

	service.rebuild_all(&entities, reindex_request()).await.expect("First reindex failed.");

	let before = fetch_entry(&service.db, "tenant-a", "contact", contact_id)
		.await
		.expect("Failed to fetch entry.")
		.expect("Contact entry missing.");

	if let SourceEntity::Contact(source) = &mut entities[0] {
		source.preferences = Some("Now wants a 3BR house with a yard.".to_string());
	}

	let report = service
		.rebuild_all(&entities, reindex_request())
		.await
		.expect("Second reindex failed.");

	assert_eq!(report.embedded_count, 1);

	let after = fetch_entry(&service.db, "tenant-a", "contact", contact_id)
		.await
		.expect("Failed to fetch entry.")
		.expect("Contact entry missing.");

	assert_ne!(after.text_hash, before.text_hash);
	assert!(after.embedding.is_some());
}

#[tokio::test]
async fn reindex_prunes_entries_missing_from_source() {
	let (_test_db, service) = super::stub_service().await;
	let orphan = transaction_maple_listing();
	let orphan_id = orphan.object_id();

	service
		.upsert(UpsertRequest { tenant_id: "tenant-a".to_string(), entity: orphan })
		.await
		.expect("Failed to seed the orphan entry.");

	let entities = vec![contact_jane_doe()];
	let report = service
		.rebuild_all(&entities, reindex_request())
		.await
		.expect("Reindex failed.");

	assert_eq!(report.rebuilt_count, 1);

	let gone = fetch_entry(&service.db, "tenant-a", "transaction", orphan_id)
		.await
		.expect("Failed to fetch entry.");

	assert!(gone.is_none());
}

#[tokio::test]
async fn failing_embedder_defers_during_reindex() {
	let providers = Providers::new(
		Arc::new(FailingEmbedding),
		Arc::new(StubGeneration { payload: "The evidence does not answer this.".to_string() }),
	);
	let (_test_db, service) = super::build_service(test_config(super::DIM), providers).await;
	let entities = vec![contact_jane_doe()];
	let report = service
		.rebuild_all(&entities, reindex_request())
		.await
		.expect("Reindex failed.");

	assert_eq!(report.rebuilt_count, 1);
	assert_eq!(report.embedded_count, 0);
	assert_eq!(report.deferred_count, 1);
	assert_eq!(
		pending_count(&service.db, "tenant-a").await.expect("Failed to count pending jobs."),
		1,
	);
}

#[tokio::test]
async fn reindex_counts_bad_entities_without_stopping() {
	let (_test_db, service) = super::stub_service().await;
	let entities = vec![
		contact_jane_doe(),
		SourceEntity::Contact(ContactSource {
			contact_id: Uuid::new_v4(),
			name: "   ".to_string(),
			tags: Vec::new(),
			notes: None,
			preferences: None,
		}),
	];
	let report = service
		.rebuild_all(&entities, reindex_request())
		.await
		.expect("Reindex failed.");

	assert_eq!(report.rebuilt_count, 1);
	assert_eq!(report.error_count, 1);
}
