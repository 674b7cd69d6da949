use serde::Serialize;
use std::collections::BTreeMap;

use crate::{round_score, CriterionScore, JudgeKind};

/// Critical issue attached to a result whose evaluator could not be consulted
pub const UNAVAILABLE_ISSUE: &str = "evaluation unavailable";

/// One evaluator kind's judgment of an artifact.
///
/// Fields are private: `overall_score` and `passed` are always derived from the
/// criteria and critical issues at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatorResult {
    kind: JudgeKind,
    criteria: BTreeMap<String, CriterionScore>,
    overall_score: f64,
    critical_issues: Vec<String>,
    passed: bool,
    degraded: bool,
}

impl EvaluatorResult {
    pub fn new(
        kind: JudgeKind,
        criteria: BTreeMap<String, CriterionScore>,
        critical_issues: Vec<String>,
        threshold: f64,
        max_critical_issues: usize,
    ) -> Self {
        let overall_score = if criteria.is_empty() {
            0.0
        } else {
            let sum: f64 = criteria.values().map(|c| c.score).sum();
            round_score(sum / criteria.len() as f64)
        };
        Self::assemble(
            kind,
            criteria,
            overall_score,
            critical_issues,
            threshold,
            max_critical_issues,
            false,
        )
    }

    /// Placeholder for an evaluator that timed out or answered garbage
    pub fn unavailable(kind: JudgeKind, threshold: f64, max_critical_issues: usize) -> Self {
        Self::assemble(
            kind,
            BTreeMap::new(),
            0.0,
            vec![UNAVAILABLE_ISSUE.to_string()],
            threshold,
            max_critical_issues,
            true,
        )
    }

    fn assemble(
        kind: JudgeKind,
        criteria: BTreeMap<String, CriterionScore>,
        overall_score: f64,
        critical_issues: Vec<String>,
        threshold: f64,
        max_critical_issues: usize,
        degraded: bool,
    ) -> Self {
        let passed = overall_score >= threshold && critical_issues.len() <= max_critical_issues;
        Self {
            kind,
            criteria,
            overall_score,
            critical_issues,
            passed,
            degraded,
        }
    }

    pub fn kind(&self) -> JudgeKind {
        self.kind
    }

    pub fn criteria(&self) -> &BTreeMap<String, CriterionScore> {
        &self.criteria
    }

    pub fn overall_score(&self) -> f64 {
        self.overall_score
    }

    pub fn critical_issues(&self) -> &[String] {
        &self.critical_issues
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    /// True when the evaluator could not be consulted
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// All criteria suggestions, in criterion name order
    pub fn suggestions(&self) -> impl Iterator<Item = &str> {
        self.criteria
            .values()
            .flat_map(|c| c.suggestions.iter().map(String::as_str))
    }

    /// All regular (non-critical) issues, in criterion name order
    pub fn issues(&self) -> impl Iterator<Item = &str> {
        self.criteria
            .values()
            .flat_map(|c| c.issues.iter().map(String::as_str))
    }
}
