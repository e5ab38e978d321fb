use std::collections::HashSet;

use common::utils::config::RetrievalConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// The fixed string returned when no grounded answer can be produced. Also a
/// string the model itself is instructed to emit, so detection is
/// case-insensitive while emission is verbatim.
pub const REFUSAL_SENTINEL: &str =
    "I don't have enough information from the document to answer that question.";

/// Returned when the best similarity score classifies the question as
/// unrelated to the document; the model is never invoked in that case.
pub const UNRELATED_ANSWER: &str =
    "That question does not relate to the document, so I can't answer it from its contents.";

// Recognition is case-insensitive; labels are emitted uppercase.
#[allow(clippy::expect_used)]
static CITATION_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[Cc](\d+)\]").expect("citation tag pattern is valid"));

/// Extracts every citation tag from an answer, normalized to `C<digits>`.
pub fn extract_citations(text: &str) -> Vec<String> {
    CITATION_TAG
        .captures_iter(text)
        .map(|captures| format!("C{}", &captures[1]))
        .collect()
}

pub fn contains_refusal(text: &str) -> bool {
    text.to_lowercase().contains(&REFUSAL_SENTINEL.to_lowercase())
}

/// Decides whether a generated answer may be returned verbatim or must be
/// replaced by the refusal sentinel. First failing check wins:
///
/// 1. An answer carrying the refusal sentinel passes through unchanged.
/// 2. An answer with no citation tags is invalid.
/// 3. A citation outside the valid label set is invalid.
/// 4. A deny-listed general-knowledge phrase is invalid regardless of
///    citations.
/// 5. A `top_score` below the strict threshold is invalid; weak retrieval
///    must not yield a confident-sounding answer even if it cites correctly.
///
/// Always yields a displayable string, never an error: a refused answer is a
/// policy outcome, not a failure.
pub fn validate_answer(
    raw: &str,
    valid_labels: &HashSet<String>,
    top_score: f32,
    config: &RetrievalConfig,
) -> String {
    if contains_refusal(raw) {
        return raw.to_string();
    }

    let citations = extract_citations(raw);
    if citations.is_empty() {
        debug!("answer rejected: no citation tags present");
        return REFUSAL_SENTINEL.to_string();
    }

    if let Some(unknown) = citations.iter().find(|label| !valid_labels.contains(*label)) {
        debug!(label = %unknown, "answer rejected: citation outside the valid set");
        return REFUSAL_SENTINEL.to_string();
    }

    let lowered = raw.to_lowercase();
    if let Some(phrase) = config
        .deny_phrases
        .iter()
        .find(|phrase| lowered.contains(&phrase.to_lowercase()))
    {
        debug!(phrase = %phrase, "answer rejected: general-knowledge phrasing");
        return REFUSAL_SENTINEL.to_string();
    }

    if top_score < config.strict_threshold {
        debug!(top_score, "answer rejected: retrieval too weak to trust");
        return REFUSAL_SENTINEL.to_string();
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn config() -> RetrievalConfig {
        RetrievalConfig::default()
    }

    #[test]
    fn test_extract_citations_normalizes_case() {
        let found = extract_citations("Claim one [C1], claim two [c2]. See also [C12].");
        assert_eq!(found, vec!["C1", "C2", "C12"]);
    }

    #[test]
    fn test_extract_ignores_malformed_tags() {
        assert!(extract_citations("[C] [Cx] [1] (C1)").is_empty());
    }

    #[test]
    fn test_refusal_sentinel_passes_through_unchanged() {
        let wrapped = format!("Unfortunately, {REFUSAL_SENTINEL}");
        let result = validate_answer(&wrapped, &labels(&[]), 0.9, &config());
        assert_eq!(result, wrapped);
    }

    #[test]
    fn test_refusal_detection_is_case_insensitive() {
        let shouted = REFUSAL_SENTINEL.to_uppercase();
        let result = validate_answer(&shouted, &labels(&[]), 0.9, &config());
        assert_eq!(result, shouted);
    }

    #[test]
    fn test_answer_without_citations_is_rejected() {
        let result = validate_answer("The answer is 42.", &labels(&["C1"]), 0.9, &config());
        assert_eq!(result, REFUSAL_SENTINEL);
    }

    #[test]
    fn test_valid_citation_is_accepted() {
        let answer = "The report states the figure was 12% [C1].";
        let result = validate_answer(answer, &labels(&["C1", "C2"]), 0.9, &config());
        assert_eq!(result, answer);
    }

    #[test]
    fn test_citation_outside_valid_set_is_rejected() {
        let answer = "The figure was 12% [C3].";
        let result = validate_answer(answer, &labels(&["C1", "C2"]), 0.9, &config());
        assert_eq!(result, REFUSAL_SENTINEL);
    }

    #[test]
    fn test_deny_phrase_overrides_correct_citation() {
        let answer = "It is well known that water boils at 100C [C1].";
        let result = validate_answer(answer, &labels(&["C1"]), 0.9, &config());
        assert_eq!(result, REFUSAL_SENTINEL);
    }

    #[test]
    fn test_deny_phrase_matching_is_case_insensitive() {
        let answer = "STUDIES SHOW this is true [C1].";
        let result = validate_answer(answer, &labels(&["C1"]), 0.9, &config());
        assert_eq!(result, REFUSAL_SENTINEL);
    }

    #[test]
    fn test_weak_retrieval_forces_refusal_despite_citations() {
        let answer = "The document claims X [C1].";
        let result = validate_answer(answer, &labels(&["C1"]), 0.19, &config());
        assert_eq!(result, REFUSAL_SENTINEL);
    }

    #[test]
    fn test_weak_retrieval_still_lets_sentinel_through() {
        let result = validate_answer(REFUSAL_SENTINEL, &labels(&["C1"]), 0.05, &config());
        assert_eq!(result, REFUSAL_SENTINEL);
    }

    #[test]
    fn test_lowercase_citation_counts_against_valid_set() {
        let answer = "The figure was 12% [c1].";
        let result = validate_answer(answer, &labels(&["C1"]), 0.9, &config());
        assert_eq!(result, answer);
    }
}
