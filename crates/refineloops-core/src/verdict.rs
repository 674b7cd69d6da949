use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use refineloops_judge::{EvaluatorResult, JudgeKind};

/// The engine's single pass/fail decision for one evaluation round.
///
/// Built by [`crate::Aggregator`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusVerdict {
    overall_score: f64,
    failed_kinds: BTreeSet<JudgeKind>,
    critical_issues: Vec<String>,
    prioritized_suggestions: Vec<String>,
    passed: bool,
    results: Vec<EvaluatorResult>,
    evaluated_at: DateTime<Utc>,
}

impl ConsensusVerdict {
    pub(crate) fn new(
        overall_score: f64,
        failed_kinds: BTreeSet<JudgeKind>,
        critical_issues: Vec<String>,
        prioritized_suggestions: Vec<String>,
        passed: bool,
        results: Vec<EvaluatorResult>,
    ) -> Self {
        Self {
            overall_score,
            failed_kinds,
            critical_issues,
            prioritized_suggestions,
            passed,
            results,
            evaluated_at: Utc::now(),
        }
    }

    pub fn overall_score(&self) -> f64 {
        self.overall_score
    }

    pub fn failed_kinds(&self) -> &BTreeSet<JudgeKind> {
        &self.failed_kinds
    }

    pub fn critical_issues(&self) -> &[String] {
        &self.critical_issues
    }

    pub fn prioritized_suggestions(&self) -> &[String] {
        &self.prioritized_suggestions
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Per-kind results, in kind order
    pub fn results(&self) -> &[EvaluatorResult] {
        &self.results
    }

    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    /// Equal in every respect except the evaluation timestamp
    pub fn same_judgement(&self, other: &Self) -> bool {
        self.overall_score == other.overall_score
            && self.failed_kinds == other.failed_kinds
            && self.critical_issues == other.critical_issues
            && self.prioritized_suggestions == other.prioritized_suggestions
            && self.passed == other.passed
            && self.results == other.results
    }

    /// Short description for logs and summaries
    pub fn short_description(&self) -> String {
        if self.passed {
            format!("PASS ({:.1})", self.overall_score)
        } else if self.failed_kinds.is_empty() && self.critical_issues.is_empty() {
            format!("FAIL ({:.1}, below overall bar)", self.overall_score)
        } else {
            format!(
                "FAIL ({:.1}, {} failed, {} critical)",
                self.overall_score,
                self.failed_kinds.len(),
                self.critical_issues.len()
            )
        }
    }
}
