use std::{collections::HashMap, time::Duration};

use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use uuid::Uuid;

use dowser_domain::{
	compose::ObjectType,
	fusion::{FusedCandidate, RetrievalCandidate, RetrievalSource, cmp_f32_desc, fuse},
	links::deep_link,
	similarity::cosine,
	text,
};
use dowser_storage::{
	index::{lexical_search, semantic_rows},
	vector::blob_to_vec,
};

use crate::{DowserService, QuotaKind, ServiceResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub tenant_id: String,
	pub query: String,
	pub top_k: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchItem {
	pub object_type: ObjectType,
	pub object_id: Uuid,
	pub label: String,
	pub score: f32,
	pub sources: Vec<RetrievalSource>,
	pub snippet: Option<String>,
	pub deep_link: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
	Quota,
	SemanticUnavailable,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub items: Vec<SearchItem>,
	pub degraded: bool,
	pub degraded_reason: Option<DegradedReason>,
}

pub(crate) struct EntryMeta {
	pub(crate) label: String,
	pub(crate) owning_contact_id: Option<Uuid>,
}

/// Fused evidence plus the per-object metadata needed to decorate it.
pub(crate) struct HybridOutcome {
	pub(crate) evidence: Vec<FusedCandidate>,
	pub(crate) meta: HashMap<(ObjectType, Uuid), EntryMeta>,
	pub(crate) degraded_reason: Option<DegradedReason>,
}

struct SemanticHit {
	candidate: RetrievalCandidate,
	label: String,
	owning_contact_id: Option<Uuid>,
}

impl DowserService {
	/// Hybrid retrieval: lexical and semantic run concurrently, scores are
	/// fused per object, and each item carries a deep link into the owning
	/// application.
	pub async fn search(&self, req: SearchRequest) -> ServiceResult<SearchResponse> {
		let top_k = crate::validate_query(&self.cfg, &req.tenant_id, &req.query, req.top_k)?;
		let outcome = self.hybrid(req.tenant_id.trim(), &req.query, top_k, true).await?;
		let degraded = outcome.degraded_reason.is_some();
		let mut items = Vec::with_capacity(outcome.evidence.len());

		for candidate in outcome.evidence {
			let Some(meta) = outcome.meta.get(&candidate.key()) else {
				continue;
			};

			items.push(SearchItem {
				object_type: candidate.object_type,
				object_id: candidate.object_id,
				label: meta.label.clone(),
				score: candidate.score,
				sources: candidate.sources,
				snippet: candidate.snippet,
				deep_link: deep_link(
					&self.cfg.links.base_url,
					candidate.object_type,
					candidate.object_id,
					meta.owning_contact_id,
				),
			});
		}

		Ok(SearchResponse { items, degraded, degraded_reason: outcome.degraded_reason })
	}

	/// Retrieval shared by search and answer. The answer path passes
	/// `consume_quota: false` because it has already charged the request.
	pub(crate) async fn hybrid(
		&self,
		tenant_id: &str,
		query: &str,
		top_k: u32,
		consume_quota: bool,
	) -> ServiceResult<HybridOutcome> {
		let terms = text::query_terms(query);

		if terms.is_empty() {
			return Ok(HybridOutcome {
				evidence: Vec::new(),
				meta: HashMap::new(),
				degraded_reason: None,
			});
		}

		let match_expr = text::match_expression(&terms);
		let (lexical_rows, semantic_outcome) = tokio::join!(
			lexical_search(
				&self.db,
				tenant_id,
				&match_expr,
				self.cfg.ranking.label_weight,
				self.cfg.ranking.body_weight,
				self.cfg.search.candidate_k,
			),
			self.semantic_branch(tenant_id, query, consume_quota),
		);
		let mut meta: HashMap<(ObjectType, Uuid), EntryMeta> = HashMap::new();
		let mut lexical = Vec::new();

		for hit in lexical_rows? {
			let Some(object_type) = ObjectType::parse(&hit.object_type) else {
				tracing::warn!(
					tenant_id,
					object_type = %hit.object_type,
					"Skipping hit with unrecognized object type.",
				);

				continue;
			};

			meta.entry((object_type, hit.object_id)).or_insert_with(|| EntryMeta {
				label: hit.label.clone(),
				owning_contact_id: hit.owning_contact_id,
			});
			lexical.push(RetrievalCandidate {
				object_type,
				object_id: hit.object_id,
				raw_score: hit.score as f32,
				snippet: Some(hit.snippet),
			});
		}

		let (semantic, degraded_reason) = match semantic_outcome {
			Ok(hits) => {
				let mut semantic = Vec::with_capacity(hits.len());

				for hit in hits {
					meta.entry((hit.candidate.object_type, hit.candidate.object_id)).or_insert(
						EntryMeta { label: hit.label, owning_contact_id: hit.owning_contact_id },
					);
					semantic.push(hit.candidate);
				}

				(semantic, None)
			},
			Err(reason) => (Vec::new(), Some(reason)),
		};
		let mut evidence = fuse(&lexical, &semantic, &self.cfg.ranking);

		evidence.truncate(top_k as usize);

		Ok(HybridOutcome { evidence, meta, degraded_reason })
	}

	/// The semantic half of a hybrid query. Never fails the request: quota
	/// denial, provider trouble, and timeouts all degrade to lexical-only
	/// with a reason. Lexical retrieval is deliberately not quota-gated.
	async fn semantic_branch(
		&self,
		tenant_id: &str,
		query: &str,
		consume_quota: bool,
	) -> Result<Vec<SemanticHit>, DegradedReason> {
		if consume_quota
			&& let Err(err) = self.check_and_consume(tenant_id, QuotaKind::Daily).await
		{
			tracing::warn!(
				tenant_id,
				%err,
				"Quota denied semantic retrieval; serving lexical only."
			);

			return Err(DegradedReason::Quota);
		}

		let limit = Duration::from_millis(self.cfg.search.semantic_timeout_ms);

		match timeout(limit, self.semantic_candidates(tenant_id, query)).await {
			Ok(Ok(hits)) => Ok(hits),
			Ok(Err(err)) => {
				tracing::warn!(tenant_id, %err, "Semantic retrieval failed; serving lexical only.");

				Err(DegradedReason::SemanticUnavailable)
			},
			Err(_) => {
				tracing::warn!(tenant_id, "Semantic retrieval timed out; serving lexical only.");

				Err(DegradedReason::SemanticUnavailable)
			},
		}
	}

	async fn semantic_candidates(
		&self,
		tenant_id: &str,
		query: &str,
	) -> color_eyre::Result<Vec<SemanticHit>> {
		let cfg = &self.cfg.providers.embedding;
		let vectors = self.providers.embedding.embed(cfg, &[query.to_string()]).await?;
		let query_vector =
			vectors.into_iter().next().ok_or_else(|| eyre::eyre!("Embedding response was empty."))?;

		if query_vector.len() != cfg.dimensions as usize {
			return Err(eyre::eyre!(
				"Query embedding has {} dimensions, index requires {}.",
				query_vector.len(),
				cfg.dimensions,
			));
		}

		let version = dowser_providers::embedding_version(cfg);
		let rows = semantic_rows(&self.db, tenant_id, &version).await?;
		let mut hits = Vec::new();

		for row in rows {
			let Some(object_type) = ObjectType::parse(&row.object_type) else {
				continue;
			};
			let score = cosine(&query_vector, &blob_to_vec(&row.embedding));

			if score < self.cfg.ranking.similarity_floor {
				continue;
			}

			hits.push(SemanticHit {
				candidate: RetrievalCandidate {
					object_type,
					object_id: row.object_id,
					raw_score: score,
					snippet: None,
				},
				label: row.label,
				owning_contact_id: row.owning_contact_id,
			});
		}

		hits.sort_by(|a, b| cmp_f32_desc(a.candidate.raw_score, b.candidate.raw_score));
		hits.truncate(self.cfg.search.candidate_k as usize);

		Ok(hits)
	}
}
