use thiserror::Error;

use refineloops_agent::ProducerError;
use refineloops_judge::ConfigError;

use crate::{RefinementState, RoundRecord};

#[derive(Error, Debug)]
pub enum RefinementError {
    /// Fatal for the session; carries the rounds completed before the failure
    #[error("Producer failed in iteration {iteration}: {source}")]
    Producer {
        iteration: usize,
        source: ProducerError,
        history: Vec<RoundRecord>,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: RefinementState,
        to: RefinementState,
    },
}

impl RefinementError {
    /// Rounds completed before the session failed
    pub fn history(&self) -> &[RoundRecord] {
        match self {
            RefinementError::Producer { history, .. } => history,
            _ => &[],
        }
    }
}
