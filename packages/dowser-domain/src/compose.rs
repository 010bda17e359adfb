use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
	Contact,
	Engagement,
	Transaction,
	Professional,
	Task,
}

impl ObjectType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Contact => "contact",
			Self::Engagement => "engagement",
			Self::Transaction => "transaction",
			Self::Professional => "professional",
			Self::Task => "task",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"contact" => Some(Self::Contact),
			"engagement" => Some(Self::Engagement),
			"transaction" => Some(Self::Transaction),
			"professional" => Some(Self::Professional),
			"task" => Some(Self::Task),
			_ => None,
		}
	}
}

impl std::fmt::Display for ObjectType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSource {
	pub contact_id: Uuid,
	pub name: String,
	#[serde(default)]
	pub tags: Vec<String>,
	pub notes: Option<String>,
	pub preferences: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementSource {
	pub engagement_id: Uuid,
	pub contact_id: Option<Uuid>,
	pub subject: String,
	pub notes: Option<String>,
	pub transcript: Option<String>,
	pub summary: Option<String>,
	pub contact_name: Option<String>,
	pub transaction_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSource {
	pub transaction_id: Uuid,
	pub address: String,
	pub status: String,
	pub notes: Option<String>,
	#[serde(default)]
	pub party_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalSource {
	pub professional_id: Uuid,
	pub name: String,
	pub category: String,
	pub company: Option<String>,
	pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSource {
	pub task_id: Uuid,
	pub contact_id: Option<Uuid>,
	pub title: String,
	pub notes: Option<String>,
	pub contact_name: Option<String>,
	pub transaction_name: Option<String>,
}

/// The denormalized view of a business object handed to the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "object_type", rename_all = "snake_case")]
pub enum SourceEntity {
	Contact(ContactSource),
	Engagement(EngagementSource),
	Transaction(TransactionSource),
	Professional(ProfessionalSource),
	Task(TaskSource),
}

impl SourceEntity {
	pub fn object_type(&self) -> ObjectType {
		match self {
			Self::Contact(_) => ObjectType::Contact,
			Self::Engagement(_) => ObjectType::Engagement,
			Self::Transaction(_) => ObjectType::Transaction,
			Self::Professional(_) => ObjectType::Professional,
			Self::Task(_) => ObjectType::Task,
		}
	}

	pub fn object_id(&self) -> Uuid {
		match self {
			Self::Contact(source) => source.contact_id,
			Self::Engagement(source) => source.engagement_id,
			Self::Transaction(source) => source.transaction_id,
			Self::Professional(source) => source.professional_id,
			Self::Task(source) => source.task_id,
		}
	}

	pub fn owning_contact_id(&self) -> Option<Uuid> {
		match self {
			Self::Engagement(source) => source.contact_id,
			Self::Task(source) => source.contact_id,
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
	pub label: String,
	pub body: String,
}

/// Builds the search text for an entity. Same entity state always yields
/// byte-identical output: fields are emitted in a fixed order, values are
/// trimmed and NFC-normalized, and empty fields are skipped.
pub fn compose(entity: &SourceEntity) -> Composed {
	let mut body = String::new();

	let label = match entity {
		SourceEntity::Contact(source) => {
			push_line(&mut body, "name", &source.name);
			push_line(&mut body, "tags", &source.tags.join(", "));
			push_opt_line(&mut body, "notes", source.notes.as_deref());
			push_opt_line(&mut body, "preferences", source.preferences.as_deref());

			source.name.as_str()
		},
		SourceEntity::Engagement(source) => {
			push_line(&mut body, "subject", &source.subject);
			push_opt_line(&mut body, "notes", source.notes.as_deref());
			push_opt_line(&mut body, "transcript", source.transcript.as_deref());
			push_opt_line(&mut body, "summary", source.summary.as_deref());
			push_opt_line(&mut body, "contact", source.contact_name.as_deref());
			push_opt_line(&mut body, "transaction", source.transaction_name.as_deref());

			source.subject.as_str()
		},
		SourceEntity::Transaction(source) => {
			push_line(&mut body, "address", &source.address);
			push_line(&mut body, "status", &source.status);
			push_opt_line(&mut body, "notes", source.notes.as_deref());
			push_line(&mut body, "parties", &source.party_names.join(", "));

			source.address.as_str()
		},
		SourceEntity::Professional(source) => {
			push_line(&mut body, "name", &source.name);
			push_line(&mut body, "category", &source.category);
			push_opt_line(&mut body, "company", source.company.as_deref());
			push_opt_line(&mut body, "notes", source.notes.as_deref());

			source.name.as_str()
		},
		SourceEntity::Task(source) => {
			push_line(&mut body, "title", &source.title);
			push_opt_line(&mut body, "notes", source.notes.as_deref());
			push_opt_line(&mut body, "contact", source.contact_name.as_deref());
			push_opt_line(&mut body, "transaction", source.transaction_name.as_deref());

			source.title.as_str()
		},
	};

	Composed { label: normalize(label), body: normalize(&body) }
}

/// Content hash over the composed text; lets the indexer and the backfill
/// worker skip embedding work when nothing changed.
pub fn text_hash(label: &str, body: &str) -> String {
	let mut hasher = blake3::Hasher::new();

	hasher.update(label.as_bytes());
	hasher.update(b"\n");
	hasher.update(body.as_bytes());

	hasher.finalize().to_hex().to_string()
}

/// The text handed to the embedding provider.
///
/// The backfill worker rebuilds the same string from the stored columns, so
/// inline and deferred embedding produce identical vectors.
pub fn embed_text(label: &str, body: &str) -> String {
	format!("{label}\n{body}")
}

fn normalize(value: &str) -> String {
	value.trim().nfc().collect()
}

fn push_line(body: &mut String, field: &str, value: &str) {
	let value = value.trim();

	if value.is_empty() {
		return;
	}
	if !body.is_empty() {
		body.push('\n');
	}

	body.push_str(field);
	body.push_str(": ");
	body.push_str(value);
}

fn push_opt_line(body: &mut String, field: &str, value: Option<&str>) {
	if let Some(value) = value {
		push_line(body, field, value);
	}
}
