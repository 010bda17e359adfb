use serde::{Deserialize, Serialize};

use dowser_domain::{
	fusion::FusedCandidate,
	grounding::{
		Citation, Confidence, REFUSAL_ANSWER, derive_confidence, evidence_strength,
		parse_citations, ungrounded_citations,
	},
};
use dowser_storage::index::fetch_entry;

use crate::{DowserService, QuotaKind, ServiceError, ServiceResult};

/// Instruction the generation provider receives with every answer request.
/// The citation shape must match what the validator parses.
const SYSTEM_PROMPT: &str = "\
You answer questions about a private set of business records. Use only the \
evidence blocks provided in the user message. Cite the blocks supporting each \
claim inline, using each block's bracketed marker exactly as printed, for \
example [contact:00000000-0000-0000-0000-000000000000]. Never cite a record \
that is not in the evidence. If the evidence cannot answer the question, say \
that it cannot.";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerRequest {
	pub tenant_id: String,
	pub query: String,
	pub top_k: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerResult {
	pub answer: String,
	pub citations: Vec<Citation>,
	pub confidence: Confidence,
	pub evidence_strength: f32,
}

enum Grounding {
	Grounded(Vec<Citation>),
	Violation(Vec<Citation>),
}

impl DowserService {
	/// Grounded answer synthesis: retrieve, prompt, validate citations
	/// locally, and refuse rather than return an answer the index cannot
	/// back. A violating first answer gets one corrective re-prompt.
	pub async fn answer(&self, req: AnswerRequest) -> ServiceResult<AnswerResult> {
		let top_k = crate::validate_query(&self.cfg, &req.tenant_id, &req.query, req.top_k)?;
		let tenant_id = req.tenant_id.trim();

		self.check_and_consume(tenant_id, QuotaKind::Answer).await?;

		let outcome = self.hybrid(tenant_id, &req.query, top_k, false).await?;

		if outcome.evidence.is_empty() {
			return Ok(refusal());
		}

		let blocks = self.evidence_blocks(tenant_id, &outcome.evidence).await?;

		if blocks.is_empty() {
			return Ok(refusal());
		}

		let prompt = answer_prompt(&req.query, &blocks);
		let first = self.complete_answer(&prompt).await?;
		let (answer, citations) = match validate_grounding(&first, &outcome.evidence) {
			Grounding::Grounded(citations) => (first, citations),
			Grounding::Violation(offending) => {
				tracing::warn!(
					tenant_id,
					offending = offending.len(),
					"Answer failed grounding validation; re-prompting once.",
				);

				let retry = corrective_prompt(&req.query, &blocks, &first, &offending);
				let second = self.complete_answer(&retry).await?;

				match validate_grounding(&second, &outcome.evidence) {
					Grounding::Grounded(citations) => (second, citations),
					Grounding::Violation(_) => {
						tracing::warn!(tenant_id, "Answer failed grounding twice; refusing.");

						return Ok(refusal());
					},
				}
			},
		};
		let cited = outcome
			.evidence
			.iter()
			.filter(|item| {
				citations.iter().any(|citation| {
					citation.object_type == item.object_type
						&& citation.object_id == item.object_id
				})
			})
			.cloned()
			.collect::<Vec<_>>();

		Ok(AnswerResult {
			answer,
			citations,
			confidence: derive_confidence(&cited),
			evidence_strength: evidence_strength(&cited),
		})
	}

	async fn complete_answer(&self, user: &str) -> ServiceResult<String> {
		self.providers
			.generation
			.complete(&self.cfg.providers.generation, SYSTEM_PROMPT, user)
			.await
			.map_err(|err| ServiceError::Upstream {
				message: format!("Generation provider failed: {err}."),
			})
	}

	/// Renders the evidence as numbered blocks with citation markers. An
	/// entry removed between retrieval and synthesis is skipped, not cited.
	async fn evidence_blocks(
		&self,
		tenant_id: &str,
		evidence: &[FusedCandidate],
	) -> ServiceResult<String> {
		let mut blocks = String::new();
		let mut number = 0;

		for item in evidence {
			let Some(entry) =
				fetch_entry(&self.db, tenant_id, item.object_type.as_str(), item.object_id).await?
			else {
				continue;
			};

			number += 1;

			blocks.push_str(&format!(
				"[{number}] [{}:{}] {}\n{}\n\n",
				item.object_type, item.object_id, entry.label, entry.body,
			));
		}

		Ok(blocks)
	}
}

fn answer_prompt(query: &str, blocks: &str) -> String {
	format!("Question: {query}\n\nEvidence:\n{blocks}")
}

fn corrective_prompt(query: &str, blocks: &str, rejected: &str, offending: &[Citation]) -> String {
	let complaint = if offending.is_empty() {
		"it cited no evidence blocks".to_string()
	} else {
		let markers = offending
			.iter()
			.map(|citation| format!("[{}:{}]", citation.object_type, citation.object_id))
			.collect::<Vec<_>>()
			.join(", ");

		format!("it cited records outside the evidence: {markers}")
	};

	format!(
		"Question: {query}\n\nEvidence:\n{blocks}Your previous answer was rejected because \
		 {complaint}. Rewrite it using only the evidence blocks above, citing each supporting \
		 block inline with its bracketed marker.\n\nRejected answer:\n{rejected}"
	)
}

/// Zero citations is itself a violation; a grounded answer must point at
/// evidence.
fn validate_grounding(answer: &str, evidence: &[FusedCandidate]) -> Grounding {
	let citations = parse_citations(answer);

	if citations.is_empty() {
		return Grounding::Violation(Vec::new());
	}

	let offending = ungrounded_citations(&citations, evidence);

	if offending.is_empty() {
		Grounding::Grounded(citations)
	} else {
		Grounding::Violation(offending)
	}
}

fn refusal() -> AnswerResult {
	AnswerResult {
		answer: REFUSAL_ANSWER.to_string(),
		citations: Vec::new(),
		confidence: Confidence::Low,
		evidence_strength: 0.0,
	}
}
