use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use dowser_domain::compose::{self, ObjectType, SourceEntity};
use dowser_storage::index::{
	UpsertEntryArgs, fetch_entry, list_object_refs, remove_entry, touch_entry, upsert_entry,
};

use crate::{BoxFuture, DowserService, ServiceError, ServiceResult};

/// Where a reindex pulls its entities from. The admin API feeds the request
/// body through the blanket [`Vec`] impl; a deployment syncing from a record
/// store hooks it here instead.
pub trait EntitySource
where
	Self: Send + Sync,
{
	fn entities<'a>(
		&'a self,
		tenant_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<SourceEntity>>>;
}

impl EntitySource for Vec<SourceEntity> {
	fn entities<'a>(
		&'a self,
		_tenant_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<SourceEntity>>> {
		let entities = self.clone();

		Box::pin(async move { Ok(entities) })
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpsertRequest {
	pub tenant_id: String,
	pub entity: SourceEntity,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpsertResponse {
	pub entry_id: Uuid,
	/// False when the vector write was deferred to the backfill queue.
	pub embedded: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoveRequest {
	pub tenant_id: String,
	pub object_type: ObjectType,
	pub object_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoveResponse {
	pub removed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReindexRequest {
	pub tenant_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReindexReport {
	pub rebuilt_count: u64,
	pub embedded_count: u64,
	pub deferred_count: u64,
	pub error_count: u64,
}

impl DowserService {
	/// Indexes one entity. Unchanged text with a current vector is only
	/// touched; changed text is rewritten and embedded inline, falling back
	/// to the backfill queue when the provider is unavailable. The entry is
	/// lexically searchable either way.
	pub async fn upsert(&self, req: UpsertRequest) -> ServiceResult<UpsertResponse> {
		let now = OffsetDateTime::now_utc();
		let tenant_id = req.tenant_id.trim();

		if tenant_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "tenant_id must be non-empty.".to_string(),
			});
		}

		let composed = compose::compose(&req.entity);

		if composed.label.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "Entity has an empty label.".to_string(),
			});
		}

		let object_type = req.entity.object_type();
		let object_id = req.entity.object_id();
		let hash = compose::text_hash(&composed.label, &composed.body);
		let version = dowser_providers::embedding_version(&self.cfg.providers.embedding);

		if let Some(existing) =
			fetch_entry(&self.db, tenant_id, object_type.as_str(), object_id).await?
			&& existing.text_hash == hash
			&& existing.embedding.is_some()
			&& existing.embedding_version == version
		{
			touch_entry(&self.db, existing.entry_id, now).await?;

			return Ok(UpsertResponse { entry_id: existing.entry_id, embedded: true });
		}

		let text = compose::embed_text(&composed.label, &composed.body);
		let embedding =
			match self.providers.embedding.embed(&self.cfg.providers.embedding, &[text]).await {
				Ok(mut vectors) if !vectors.is_empty() => Some(vectors.swap_remove(0)),
				Ok(_) => {
					tracing::warn!(
						tenant_id,
						"Embedding response was empty; deferring to backfill."
					);

					None
				},
				Err(err) => {
					tracing::warn!(tenant_id, %err, "Embedding failed; deferring to backfill.");

					None
				},
			};
		let entry_id = upsert_entry(&self.db, UpsertEntryArgs {
			entry_id: Uuid::new_v4(),
			tenant_id,
			object_type: object_type.as_str(),
			object_id,
			label: &composed.label,
			body: &composed.body,
			text_hash: &hash,
			owning_contact_id: req.entity.owning_contact_id(),
			embedding: embedding.as_deref(),
			embedding_dim: self.cfg.providers.embedding.dimensions,
			embedding_version: &version,
			updated_at: now,
			enqueue_backfill: embedding.is_none(),
		})
		.await?;

		Ok(UpsertResponse { entry_id, embedded: embedding.is_some() })
	}

	pub async fn remove(&self, req: RemoveRequest) -> ServiceResult<RemoveResponse> {
		let tenant_id = req.tenant_id.trim();

		if tenant_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "tenant_id must be non-empty.".to_string(),
			});
		}

		let removed =
			remove_entry(&self.db, tenant_id, req.object_type.as_str(), req.object_id).await?;

		Ok(RemoveResponse { removed })
	}

	/// Re-indexes every entity the source reports for the tenant, then prunes
	/// entries whose object the source no longer knows. Running it twice over
	/// an unchanged source is a no-op apart from `updated_at`.
	pub async fn rebuild_all(
		&self,
		source: &dyn EntitySource,
		req: ReindexRequest,
	) -> ServiceResult<ReindexReport> {
		let tenant_id = req.tenant_id.trim();

		if tenant_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "tenant_id must be non-empty.".to_string(),
			});
		}

		let entities = source.entities(tenant_id).await.map_err(|err| ServiceError::Upstream {
			message: format!("Entity source failed: {err}."),
		})?;
		let mut report = ReindexReport::default();
		let mut seen: HashSet<(ObjectType, Uuid)> = HashSet::new();

		for entity in entities {
			seen.insert((entity.object_type(), entity.object_id()));

			match self.upsert(UpsertRequest { tenant_id: tenant_id.to_string(), entity }).await {
				Ok(response) => {
					report.rebuilt_count += 1;

					if response.embedded {
						report.embedded_count += 1;
					} else {
						report.deferred_count += 1;
					}
				},
				Err(err) => {
					report.error_count += 1;

					tracing::error!(tenant_id, %err, "Reindex entry failed; continuing.");
				},
			}
		}

		let mut pruned = 0_u64;

		for (type_name, object_id) in list_object_refs(&self.db, tenant_id).await? {
			// Entries under an unrecognized type name cannot come from the
			// source anymore; prune those too.
			let keep = ObjectType::parse(&type_name)
				.is_some_and(|object_type| seen.contains(&(object_type, object_id)));

			if !keep && remove_entry(&self.db, tenant_id, &type_name, object_id).await? {
				pruned += 1;
			}
		}

		if pruned > 0 {
			tracing::info!(tenant_id, pruned, "Reindex pruned entries gone from the source.");
		}

		Ok(report)
	}
}
