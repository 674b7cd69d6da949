//! Weight, threshold and criteria tables for the evaluator panel.
//!
//! The table is built once at startup, validated, and then shared read-only
//! (`Arc<ScoringConfig>`) with the invoker and the aggregator.

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::{JudgeKind, MAX_SCORE};

/// Global bar the weighted overall score must reach
pub const OVERALL_THRESHOLD: f64 = 7.0;

/// Critical issues a single evaluator may report and still pass
pub const MAX_CRITICAL_ISSUES_ALLOWED: usize = 0;

/// Per-call evaluator deadline
pub const DEFAULT_EVALUATOR_TIMEOUT: Duration = Duration::from_secs(120);

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("No evaluator kinds configured")]
    EmptyTable,

    #[error("Invalid weight {weight} for {kind}: must be finite and positive")]
    InvalidWeight { kind: JudgeKind, weight: f64 },

    #[error("Invalid threshold {threshold} for {kind}: must be in (0, 10]")]
    InvalidThreshold { kind: JudgeKind, threshold: f64 },

    #[error("No criteria configured for {0}")]
    EmptyCriteria(JudgeKind),

    #[error("Criterion '{criterion}' listed twice for {kind}")]
    DuplicateCriterion { kind: JudgeKind, criterion: String },

    #[error("Invalid overall threshold {0}: must be in [0, 10]")]
    InvalidOverallThreshold(f64),

    #[error("Evaluator timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Evaluator registered for {0} but the kind has no weight/threshold profile")]
    UnknownKind(JudgeKind),

    #[error("More than one evaluator registered for {0}")]
    DuplicateEvaluator(JudgeKind),

    #[error("No evaluators registered")]
    NoEvaluators,

    #[error("Invalid engine configuration: {0}")]
    Invalid(String),
}

/// Weight, pass threshold and criterion schema of one evaluator kind
#[derive(Debug, Clone, PartialEq)]
pub struct KindProfile {
    pub weight: f64,
    pub threshold: f64,
    pub criteria: Vec<String>,
}

impl KindProfile {
    pub fn new(weight: f64, threshold: f64, criteria: &[&str]) -> Self {
        Self {
            weight,
            threshold,
            criteria: criteria.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub kinds: BTreeMap<JudgeKind, KindProfile>,
    pub overall_threshold: f64,
    pub max_critical_issues: usize,
    pub evaluator_timeout: Duration,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl ScoringConfig {
    /// A config with no kinds and the default global constants
    pub fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
            overall_threshold: OVERALL_THRESHOLD,
            max_critical_issues: MAX_CRITICAL_ISSUES_ALLOWED,
            evaluator_timeout: DEFAULT_EVALUATOR_TIMEOUT,
        }
    }

    /// The production panel
    pub fn canonical() -> Self {
        Self::empty()
            .with_kind(
                JudgeKind::Aesthetic,
                KindProfile::new(
                    0.35,
                    7.0,
                    &["visual_balance", "color_harmony", "typography", "simplicity"],
                ),
            )
            .with_kind(
                JudgeKind::BrandFit,
                KindProfile::new(
                    0.25,
                    8.0,
                    &[
                        "brand_personality",
                        "audience_fit",
                        "memorability",
                        "distinctiveness",
                    ],
                ),
            )
            .with_kind(
                JudgeKind::Technical,
                KindProfile::new(0.15, 6.0, &["svg_validity", "scalability", "file_efficiency"]),
            )
            .with_kind(
                JudgeKind::Usability,
                KindProfile::new(
                    0.25,
                    7.5,
                    &[
                        "legibility",
                        "contrast",
                        "small_size_rendering",
                        "monochrome_viability",
                    ],
                ),
            )
    }

    pub fn with_kind(mut self, kind: JudgeKind, profile: KindProfile) -> Self {
        self.kinds.insert(kind, profile);
        self
    }

    pub fn with_overall_threshold(mut self, threshold: f64) -> Self {
        self.overall_threshold = threshold;
        self
    }

    pub fn with_max_critical_issues(mut self, max: usize) -> Self {
        self.max_critical_issues = max;
        self
    }

    pub fn with_evaluator_timeout(mut self, timeout: Duration) -> Self {
        self.evaluator_timeout = timeout;
        self
    }

    pub fn profile(&self, kind: JudgeKind) -> Option<&KindProfile> {
        self.kinds.get(&kind)
    }

    pub fn weight(&self, kind: JudgeKind) -> Option<f64> {
        self.kinds.get(&kind).map(|p| p.weight)
    }

    pub fn threshold(&self, kind: JudgeKind) -> Option<f64> {
        self.kinds.get(&kind).map(|p| p.threshold)
    }

    pub fn total_weight(&self) -> f64 {
        self.kinds.values().map(|p| p.weight).sum()
    }

    /// Reject tables the engine cannot score with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kinds.is_empty() {
            return Err(ConfigError::EmptyTable);
        }

        for (kind, profile) in &self.kinds {
            if !profile.weight.is_finite() || profile.weight <= 0.0 {
                return Err(ConfigError::InvalidWeight {
                    kind: *kind,
                    weight: profile.weight,
                });
            }
            // A zero threshold would let a degraded (score 0) result pass its own bar
            if !profile.threshold.is_finite()
                || profile.threshold <= 0.0
                || profile.threshold > MAX_SCORE
            {
                return Err(ConfigError::InvalidThreshold {
                    kind: *kind,
                    threshold: profile.threshold,
                });
            }
            if profile.criteria.is_empty() {
                return Err(ConfigError::EmptyCriteria(*kind));
            }
            for (i, criterion) in profile.criteria.iter().enumerate() {
                if profile.criteria[..i].contains(criterion) {
                    return Err(ConfigError::DuplicateCriterion {
                        kind: *kind,
                        criterion: criterion.clone(),
                    });
                }
            }
        }

        if !self.overall_threshold.is_finite()
            || !(0.0..=MAX_SCORE).contains(&self.overall_threshold)
        {
            return Err(ConfigError::InvalidOverallThreshold(self.overall_threshold));
        }

        if self.evaluator_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let total = self.total_weight();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warn!(total_weight = total, "Evaluator weights do not sum to 1.0");
        }

        Ok(())
    }
}
