mod aggregator;
mod config;
mod controller;
mod error;
mod outcome;
mod session;
mod suggestions;
mod verdict;

pub use aggregator::Aggregator;
pub use config::{EngineConfig, DEFAULT_MAX_ITERATIONS};
pub use controller::RefinementController;
pub use error::RefinementError;
pub use outcome::RefinementOutcome;
pub use session::{RefinementSession, RefinementState, RoundDecision, RoundRecord};
pub use suggestions::{prioritize_suggestions, MAX_PRIORITIZED_SUGGESTIONS};
pub use verdict::ConsensusVerdict;
