use serde::{Deserialize, Serialize};

/// Upper bound of every criterion score
pub const MAX_SCORE: f64 = 10.0;

/// One named quality dimension's judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    /// 0.0 ..= MAX_SCORE
    pub score: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl CriterionScore {
    pub fn new(score: f64, reasoning: impl Into<String>) -> Self {
        Self {
            score,
            reasoning: reasoning.into(),
            issues: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn is_in_range(&self) -> bool {
        self.score.is_finite() && (0.0..=MAX_SCORE).contains(&self.score)
    }
}

/// Round to one decimal place, half away from zero
pub fn round_score(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
