use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compose::ObjectType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
	Lexical,
	Semantic,
}

/// One hit from a single retrieval source, before fusion. `raw_score` is
/// source-relative: negated bm25 rank for lexical, cosine similarity for
/// semantic. Only the ordering within one source matters.
#[derive(Debug, Clone)]
pub struct RetrievalCandidate {
	pub object_type: ObjectType,
	pub object_id: Uuid,
	pub raw_score: f32,
	pub snippet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FusedCandidate {
	pub object_type: ObjectType,
	pub object_id: Uuid,
	pub score: f32,
	pub sources: Vec<RetrievalSource>,
	pub snippet: Option<String>,
}

impl FusedCandidate {
	pub fn key(&self) -> (ObjectType, Uuid) {
		(self.object_type, self.object_id)
	}
}

/// Merges the two source lists into one deduplicated ranking. Pure and
/// deterministic: equal inputs always produce identical output.
///
/// Scores are min-max normalized per source to [0, 1], combined with the
/// configured weights, and a fixed bonus is added once when an object was
/// found by both sources. Ordering: combined score desc, then source count
/// desc, then object id asc.
pub fn fuse(
	lexical: &[RetrievalCandidate],
	semantic: &[RetrievalCandidate],
	cfg: &dowser_config::Ranking,
) -> Vec<FusedCandidate> {
	let mut merged: HashMap<(ObjectType, Uuid), FusedCandidate> = HashMap::new();

	for (source, weight, candidates) in [
		(RetrievalSource::Lexical, cfg.lexical_weight, lexical),
		(RetrievalSource::Semantic, cfg.semantic_weight, semantic),
	] {
		let normalized = normalize_scores(candidates);

		for (candidate, norm) in candidates.iter().zip(normalized) {
			let key = (candidate.object_type, candidate.object_id);
			let entry = merged.entry(key).or_insert_with(|| FusedCandidate {
				object_type: candidate.object_type,
				object_id: candidate.object_id,
				score: 0.0,
				sources: Vec::new(),
				snippet: None,
			});

			// A source list is already deduplicated per object; if an
			// upstream bug violates that, keep the first (best-ranked) hit.
			if entry.sources.contains(&source) {
				continue;
			}

			entry.score += weight * norm;
			entry.sources.push(source);

			if entry.snippet.is_none() {
				entry.snippet = candidate.snippet.clone();
			}
		}
	}

	let mut fused: Vec<FusedCandidate> = merged.into_values().collect();

	for candidate in &mut fused {
		if candidate.sources.len() > 1 {
			candidate.score += cfg.dual_source_bonus;
		}

		candidate.sources.sort();
	}

	fused.sort_by(|left, right| {
		cmp_f32_desc(left.score, right.score)
			.then_with(|| right.sources.len().cmp(&left.sources.len()))
			.then_with(|| left.object_id.cmp(&right.object_id))
			.then_with(|| left.object_type.cmp(&right.object_type))
	});

	fused
}

/// Min-max normalization of a source's raw scores into [0, 1]. All-equal
/// scores collapse to 1.0 so a single-hit source still contributes its full
/// weight; an empty source yields an empty list.
fn normalize_scores(candidates: &[RetrievalCandidate]) -> Vec<f32> {
	if candidates.is_empty() {
		return Vec::new();
	}

	let mut min = f32::INFINITY;
	let mut max = f32::NEG_INFINITY;

	for candidate in candidates {
		min = min.min(candidate.raw_score);
		max = max.max(candidate.raw_score);
	}

	let range = max - min;

	if !range.is_finite() || range.abs() < f32::EPSILON {
		return vec![1.0; candidates.len()];
	}

	candidates
		.iter()
		.map(|candidate| ((candidate.raw_score - min) / range).clamp(0.0, 1.0))
		.collect()
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
