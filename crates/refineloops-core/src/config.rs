use std::sync::Arc;

use refineloops_judge::{ConfigError, ScoringConfig};

/// Rounds a session may run before settling for its best attempt
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Engine-wide configuration, built once at startup and shared read-only
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scoring: Arc<ScoringConfig>,
    pub max_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(Arc::new(ScoringConfig::canonical()))
    }
}

impl EngineConfig {
    pub fn new(scoring: Arc<ScoringConfig>) -> Self {
        Self {
            scoring,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
