use serde::Serialize;
use std::time::Duration;

use refineloops_agent::Artifact;

use crate::{ConsensusVerdict, RoundRecord};

/// The final outcome of a refinement session
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefinementOutcome {
    /// An artifact cleared every bar
    Passed {
        iterations: usize,
        artifact: Artifact,
        verdict: ConsensusVerdict,
        #[serde(skip)]
        history: Vec<RoundRecord>,
        total_duration_secs: f64,
    },
    /// Budget exhausted; the best-scoring attempt did not pass
    BestEffort {
        iterations: usize,
        best_iteration: usize,
        artifact: Artifact,
        verdict: ConsensusVerdict,
        #[serde(skip)]
        history: Vec<RoundRecord>,
        total_duration_secs: f64,
    },
}

impl RefinementOutcome {
    pub fn passed_with(
        iterations: usize,
        record: RoundRecord,
        history: Vec<RoundRecord>,
        duration: Duration,
    ) -> Self {
        Self::Passed {
            iterations,
            artifact: record.artifact,
            verdict: record.verdict,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn best_effort_with(
        iterations: usize,
        best: RoundRecord,
        history: Vec<RoundRecord>,
        duration: Duration,
    ) -> Self {
        Self::BestEffort {
            iterations,
            best_iteration: best.iteration,
            artifact: best.artifact,
            verdict: best.verdict,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    /// Rounds actually run
    pub fn iterations(&self) -> usize {
        match self {
            Self::Passed { iterations, .. } => *iterations,
            Self::BestEffort { iterations, .. } => *iterations,
        }
    }

    /// True when an artifact cleared every bar
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    pub fn artifact(&self) -> &Artifact {
        match self {
            Self::Passed { artifact, .. } => artifact,
            Self::BestEffort { artifact, .. } => artifact,
        }
    }

    pub fn verdict(&self) -> &ConsensusVerdict {
        match self {
            Self::Passed { verdict, .. } => verdict,
            Self::BestEffort { verdict, .. } => verdict,
        }
    }

    pub fn history(&self) -> &[RoundRecord] {
        match self {
            Self::Passed { history, .. } => history,
            Self::BestEffort { history, .. } => history,
        }
    }

    pub fn total_duration_secs(&self) -> f64 {
        match self {
            Self::Passed {
                total_duration_secs,
                ..
            } => *total_duration_secs,
            Self::BestEffort {
                total_duration_secs,
                ..
            } => *total_duration_secs,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Passed { .. } => 0,
            Self::BestEffort { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Aggregator;
    use refineloops_judge::{CriterionScore, EvaluatorResult, JudgeKind, ScoringConfig};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn record(iteration: usize, score: f64) -> RoundRecord {
        let mut criteria = BTreeMap::new();
        criteria.insert("only".to_string(), CriterionScore::new(score, ""));
        let result = EvaluatorResult::new(JudgeKind::Aesthetic, criteria, vec![], 7.0, 0);
        let verdict =
            Aggregator::new(Arc::new(ScoringConfig::canonical())).aggregate(&[result]);
        RoundRecord {
            iteration,
            artifact: Artifact::new(iteration, format!("<svg>{}</svg>", iteration)),
            verdict,
        }
    }

    #[test]
    fn test_passed_outcome() {
        let accepted = record(2, 9.0);
        let history = vec![record(1, 5.0), accepted.clone()];
        let outcome =
            RefinementOutcome::passed_with(2, accepted, history, Duration::from_secs(3));

        assert!(outcome.passed());
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.iterations(), 2);
        assert_eq!(outcome.artifact().iteration, 2);
        assert_eq!(outcome.history().len(), 2);
        assert_eq!(outcome.total_duration_secs(), 3.0);
    }

    #[test]
    fn test_best_effort_outcome() {
        let best = record(1, 6.5);
        let history = vec![best.clone(), record(2, 6.0)];
        let outcome =
            RefinementOutcome::best_effort_with(2, best, history, Duration::from_secs(1));

        assert!(!outcome.passed());
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(outcome.iterations(), 2);
        assert_eq!(outcome.artifact().iteration, 1);
        assert_eq!(outcome.verdict().overall_score(), 6.5);
    }

    #[test]
    fn test_history_is_not_serialized() {
        let accepted = record(1, 9.0);
        let outcome = RefinementOutcome::passed_with(
            1,
            accepted.clone(),
            vec![accepted],
            Duration::from_secs(1),
        );
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "passed");
        assert!(json.get("history").is_none());
    }
}
