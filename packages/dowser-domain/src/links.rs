use uuid::Uuid;

use crate::compose::ObjectType;

/// Deep link into the owning application. Engagements and tasks nest under
/// their owning contact when one is known; everything else is top-level.
pub fn deep_link(
	base_url: &str,
	object_type: ObjectType,
	object_id: Uuid,
	owning_contact_id: Option<Uuid>,
) -> String {
	match (object_type, owning_contact_id) {
		(ObjectType::Contact, _) => format!("{base_url}/contacts/{object_id}"),
		(ObjectType::Engagement, Some(contact_id)) => {
			format!("{base_url}/contacts/{contact_id}/engagements/{object_id}")
		},
		(ObjectType::Engagement, None) => format!("{base_url}/engagements/{object_id}"),
		(ObjectType::Transaction, _) => format!("{base_url}/transactions/{object_id}"),
		(ObjectType::Professional, _) => format!("{base_url}/professionals/{object_id}"),
		(ObjectType::Task, Some(contact_id)) => {
			format!("{base_url}/contacts/{contact_id}/tasks/{object_id}")
		},
		(ObjectType::Task, None) => format!("{base_url}/tasks/{object_id}"),
	}
}
