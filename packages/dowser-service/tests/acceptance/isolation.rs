use dowser_domain::compose::ObjectType;
use dowser_service::{RemoveRequest, SearchItem, SearchRequest};
use dowser_testkit::contact_jane_doe;

async fn search_items(
	service: &dowser_service::DowserService,
	tenant_id: &str,
	query: &str,
) -> Vec<SearchItem> {
	service
		.search(SearchRequest {
			tenant_id: tenant_id.to_string(),
			query: query.to_string(),
			top_k: None,
		})
		.await
		.expect("Search failed.")
		.items
}

#[tokio::test]
async fn search_never_crosses_tenants() {
	let (_test_db, service) = super::stub_service().await;
	let a_contact = super::seed(&service, "tenant-a", contact_jane_doe()).await;
	let b_contact = super::seed(&service, "tenant-b", contact_jane_doe()).await;
	let a_items = search_items(&service, "tenant-a", "Jane Doe buyer").await;

	assert!(!a_items.is_empty());
	assert!(a_items.iter().all(|item| item.object_id == a_contact));

	let b_items = search_items(&service, "tenant-b", "Jane Doe buyer").await;

	assert!(!b_items.is_empty());
	assert!(b_items.iter().all(|item| item.object_id == b_contact));
}

#[tokio::test]
async fn remove_is_tenant_scoped() {
	let (_test_db, service) = super::stub_service().await;
	let contact_id = super::seed(&service, "tenant-a", contact_jane_doe()).await;
	let response = service
		.remove(RemoveRequest {
			tenant_id: "tenant-b".to_string(),
			object_type: ObjectType::Contact,
			object_id: contact_id,
		})
		.await
		.expect("Remove failed.");

	assert!(!response.removed);
	assert!(!search_items(&service, "tenant-a", "Jane Doe buyer").await.is_empty());

	let response = service
		.remove(RemoveRequest {
			tenant_id: "tenant-a".to_string(),
			object_type: ObjectType::Contact,
			object_id: contact_id,
		})
		.await
		.expect("Remove failed.");

	assert!(response.removed);
	assert!(search_items(&service, "tenant-a", "Jane Doe buyer").await.is_empty());
}
