mod config;
mod criterion;
pub mod evaluator;
mod invoker;
mod kind;
mod prompts;
mod response;
mod result;

pub use config::{
    ConfigError, KindProfile, ScoringConfig, DEFAULT_EVALUATOR_TIMEOUT,
    MAX_CRITICAL_ISSUES_ALLOWED, OVERALL_THRESHOLD,
};
pub use criterion::{round_score, CriterionScore, MAX_SCORE};
pub use evaluator::{CommandEvaluator, EvaluationContext, EvaluationError, Evaluator};
pub use invoker::EvaluatorInvoker;
pub use kind::JudgeKind;
pub use prompts::JudgePrompts;
pub use response::{EvaluatorResponse, ResponseError};
pub use result::{EvaluatorResult, UNAVAILABLE_ISSUE};
