use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{compose::ObjectType, fusion::FusedCandidate};

/// Inline citation marker shape the generation provider is instructed to
/// emit, e.g. `[contact:7f8d…]`.
const CITATION_PATTERN: &str = r"\[(contact|engagement|transaction|professional|task):([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\]";

pub const REFUSAL_ANSWER: &str = "I could not produce a grounded answer from the indexed records.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
	pub object_type: ObjectType,
	pub object_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
	High,
	Medium,
	Low,
}

/// Extracts citations from generated text in first-appearance order, deduped.
/// A pattern that fails to compile yields no citations, which downstream
/// treats as ungrounded.
pub fn parse_citations(answer: &str) -> Vec<Citation> {
	let Ok(pattern) = Regex::new(CITATION_PATTERN) else {
		return Vec::new();
	};
	let mut out = Vec::new();

	for capture in pattern.captures_iter(answer) {
		let Some(object_type) = capture.get(1).and_then(|m| ObjectType::parse(m.as_str())) else {
			continue;
		};
		let Some(object_id) = capture.get(2).and_then(|m| Uuid::parse_str(m.as_str()).ok()) else {
			continue;
		};
		let citation = Citation { object_type, object_id };

		if !out.contains(&citation) {
			out.push(citation);
		}
	}

	out
}

/// Returns the citations that do not appear in the evidence set. Empty means
/// every citation is grounded.
pub fn ungrounded_citations(citations: &[Citation], evidence: &[FusedCandidate]) -> Vec<Citation> {
	citations
		.iter()
		.filter(|citation| {
			!evidence.iter().any(|item| {
				item.object_type == citation.object_type && item.object_id == citation.object_id
			})
		})
		.copied()
		.collect()
}

/// Confidence over the cited evidence: High needs at least two items that
/// both sources agreed on, Medium needs one dual-source item or at least two
/// corroborating items, everything else is Low.
pub fn derive_confidence(cited: &[FusedCandidate]) -> Confidence {
	let dual = cited.iter().filter(|item| item.sources.len() > 1).count();

	if dual >= 2 {
		Confidence::High
	} else if dual == 1 || cited.len() >= 2 {
		Confidence::Medium
	} else {
		Confidence::Low
	}
}

/// Raw evidence-strength signal behind the confidence label: the sum of
/// combined scores, with dual-source items counted once per source.
pub fn evidence_strength(cited: &[FusedCandidate]) -> f32 {
	cited.iter().map(|item| item.score * item.sources.len() as f32).sum()
}
