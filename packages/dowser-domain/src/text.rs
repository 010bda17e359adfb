use unicode_segmentation::UnicodeSegmentation;

/// Segments a free-text query into lowercase search terms, deduped with
/// first-appearance order preserved.
pub fn query_terms(query: &str) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();

	for word in query.unicode_words() {
		let term = word.to_lowercase();

		if !out.contains(&term) {
			out.push(term);
		}
	}

	out
}

/// Renders terms as an OR query for the store's text-search parser. Quoting
/// each term keeps user input from being read as query syntax; OR keeps
/// long natural-language queries in ranked-retrieval territory where bm25
/// still rewards multi-term matches.
pub fn match_expression(terms: &[String]) -> String {
	terms
		.iter()
		.map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
		.collect::<Vec<_>>()
		.join(" OR ")
}
