use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use refineloops_judge::{round_score, EvaluatorResult, ScoringConfig};

use crate::{prioritize_suggestions, ConsensusVerdict};

/// Combines one round's evaluator results into a consensus verdict.
///
/// Pure apart from the verdict timestamp: the same results, in any order,
/// yield the same judgement.
pub struct Aggregator {
    config: Arc<ScoringConfig>,
}

impl Aggregator {
    pub fn new(config: Arc<ScoringConfig>) -> Self {
        Self { config }
    }

    pub fn aggregate(&self, results: &[EvaluatorResult]) -> ConsensusVerdict {
        let mut ordered: Vec<EvaluatorResult> = results.to_vec();
        ordered.sort_by_key(|r| r.kind());

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for result in &ordered {
            match self.config.weight(result.kind()) {
                Some(weight) => {
                    weighted_sum += result.overall_score() * weight;
                    total_weight += weight;
                }
                None => warn!(kind = %result.kind(), "No weight configured, result ignored in overall score"),
            }
        }

        // Divide by the weight actually present rather than assuming 1.0
        let overall_score = if total_weight > 0.0 {
            round_score(weighted_sum / total_weight)
        } else {
            0.0
        };

        let failed_kinds: BTreeSet<_> = ordered
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.kind())
            .collect();

        let critical_issues: Vec<String> = ordered
            .iter()
            .flat_map(|r| r.critical_issues().iter().cloned())
            .collect();

        let prioritized_suggestions = prioritize_suggestions(&ordered);

        let passed = !ordered.is_empty()
            && failed_kinds.is_empty()
            && critical_issues.is_empty()
            && overall_score >= self.config.overall_threshold;

        debug!(
            overall_score,
            passed,
            failed_kinds = failed_kinds.len(),
            critical_issues = critical_issues.len(),
            "Aggregated verdict"
        );

        ConsensusVerdict::new(
            overall_score,
            failed_kinds,
            critical_issues,
            prioritized_suggestions,
            passed,
            ordered,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refineloops_judge::{CriterionScore, JudgeKind, KindProfile};
    use std::collections::BTreeMap;

    fn result(kind: JudgeKind, score: f64, critical: &[&str]) -> EvaluatorResult {
        let config = ScoringConfig::canonical();
        let mut criteria = BTreeMap::new();
        criteria.insert("only".to_string(), CriterionScore::new(score, ""));
        EvaluatorResult::new(
            kind,
            criteria,
            critical.iter().map(|c| c.to_string()).collect(),
            config.threshold(kind).unwrap(),
            config.max_critical_issues,
        )
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(Arc::new(ScoringConfig::canonical()))
    }

    #[test]
    fn test_all_kinds_pass() {
        let verdict = aggregator().aggregate(&[
            result(JudgeKind::Aesthetic, 8.2, &[]),
            result(JudgeKind::BrandFit, 8.5, &[]),
            result(JudgeKind::Technical, 6.9, &[]),
            result(JudgeKind::Usability, 7.6, &[]),
        ]);

        assert_eq!(verdict.overall_score(), 7.9);
        assert!(verdict.failed_kinds().is_empty());
        assert!(verdict.passed());
    }

    #[test]
    fn test_one_failing_kind_blocks_pass() {
        let verdict = aggregator().aggregate(&[
            result(JudgeKind::Aesthetic, 8.2, &[]),
            result(JudgeKind::BrandFit, 8.5, &[]),
            result(JudgeKind::Technical, 5.5, &[]),
            result(JudgeKind::Usability, 7.6, &[]),
        ]);

        assert!(verdict.overall_score() > 7.0);
        assert_eq!(
            verdict.failed_kinds().iter().copied().collect::<Vec<_>>(),
            vec![JudgeKind::Technical]
        );
        assert!(!verdict.passed());
    }

    #[test]
    fn test_critical_issue_vetoes_high_score() {
        let verdict = aggregator().aggregate(&[
            result(JudgeKind::Aesthetic, 9.8, &[]),
            result(JudgeKind::BrandFit, 9.8, &["trademark conflict"]),
            result(JudgeKind::Technical, 9.8, &[]),
            result(JudgeKind::Usability, 9.8, &[]),
        ]);

        assert_eq!(verdict.overall_score(), 9.8);
        assert_eq!(verdict.critical_issues(), &["trademark conflict".to_string()]);
        assert!(!verdict.passed());
    }

    #[test]
    fn test_critical_issue_blocks_even_when_tolerated_per_kind() {
        let config = ScoringConfig::canonical().with_max_critical_issues(1);
        let mut criteria = BTreeMap::new();
        criteria.insert("only".to_string(), CriterionScore::new(9.0, ""));
        let tolerated = EvaluatorResult::new(
            JudgeKind::Aesthetic,
            criteria,
            vec!["minor clash".into()],
            7.0,
            config.max_critical_issues,
        );
        assert!(tolerated.passed());

        let verdict = Aggregator::new(Arc::new(config)).aggregate(&[tolerated]);
        assert!(verdict.failed_kinds().is_empty());
        assert!(!verdict.passed());
    }

    #[test]
    fn test_below_overall_bar_fails() {
        let config = ScoringConfig::empty()
            .with_kind(JudgeKind::Technical, KindProfile::new(1.0, 6.0, &["only"]));
        let mut criteria = BTreeMap::new();
        criteria.insert("only".to_string(), CriterionScore::new(6.5, ""));
        let passing_kind = EvaluatorResult::new(JudgeKind::Technical, criteria, vec![], 6.0, 0);

        let verdict = Aggregator::new(Arc::new(config)).aggregate(&[passing_kind]);
        assert!(verdict.failed_kinds().is_empty());
        assert_eq!(verdict.overall_score(), 6.5);
        assert!(!verdict.passed());
    }

    #[test]
    fn test_divides_by_present_weight() {
        // 0.35 * 8.0 + 0.15 * 6.0 = 3.7 over 0.5
        let verdict = aggregator().aggregate(&[
            result(JudgeKind::Aesthetic, 8.0, &[]),
            result(JudgeKind::Technical, 6.0, &[]),
        ]);
        assert_eq!(verdict.overall_score(), 7.4);
    }

    #[test]
    fn test_degraded_result_forces_failure() {
        let verdict = aggregator().aggregate(&[
            result(JudgeKind::Aesthetic, 9.5, &[]),
            result(JudgeKind::BrandFit, 9.5, &[]),
            EvaluatorResult::unavailable(JudgeKind::Technical, 6.0, 0),
            result(JudgeKind::Usability, 9.5, &[]),
        ]);

        assert!(verdict.failed_kinds().contains(&JudgeKind::Technical));
        assert_eq!(verdict.critical_issues().len(), 1);
        assert!(!verdict.passed());
    }

    #[test]
    fn test_empty_results_never_pass() {
        let config = ScoringConfig::canonical().with_overall_threshold(0.0);
        let verdict = Aggregator::new(Arc::new(config)).aggregate(&[]);
        assert_eq!(verdict.overall_score(), 0.0);
        assert!(!verdict.passed());
    }

    #[test]
    fn test_order_does_not_matter() {
        let a = result(JudgeKind::Aesthetic, 6.0, &["cramped"]);
        let b = result(JudgeKind::Usability, 8.0, &[]);
        let aggregator = aggregator();

        let forward = aggregator.aggregate(&[a.clone(), b.clone()]);
        let backward = aggregator.aggregate(&[b, a]);
        assert!(forward.same_judgement(&backward));
    }
}
