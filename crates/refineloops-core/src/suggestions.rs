use std::collections::HashSet;

use refineloops_judge::EvaluatorResult;

/// Length cap of the prioritized suggestion list
pub const MAX_PRIORITIZED_SUGGESTIONS: usize = 10;

/// Order improvement suggestions by the weakness of the evaluator that raised them.
///
/// Suggestions from the lowest-scoring evaluator come first. Ties keep the
/// flatten order (kind order, then criterion name order). Exact duplicates
/// keep only their highest-priority occurrence.
pub fn prioritize_suggestions(results: &[EvaluatorResult]) -> Vec<String> {
    let mut ordered: Vec<&EvaluatorResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.kind());

    let mut tagged: Vec<(f64, &str)> = Vec::new();
    for result in &ordered {
        for suggestion in result.suggestions() {
            tagged.push((result.overall_score(), suggestion));
        }
    }

    // sort_by is stable
    tagged.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut seen = HashSet::new();
    tagged
        .into_iter()
        .filter(|(_, suggestion)| seen.insert(*suggestion))
        .take(MAX_PRIORITIZED_SUGGESTIONS)
        .map(|(_, suggestion)| suggestion.to_string())
        .collect()
}
