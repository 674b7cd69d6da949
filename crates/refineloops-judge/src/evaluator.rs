use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use refineloops_agent::{AgentError, Artifact, ArtifactRequest, CommandConfig, ProcessSpawner};

use crate::{EvaluatorResponse, JudgeKind, JudgePrompts, ResponseError};

/// What an evaluator gets to know besides the artifact itself
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub request: &'a ArtifactRequest,
    /// Criterion names the evaluator must score
    pub criteria: &'a [String],
    pub iteration: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Evaluator timed out after {0:?}")]
    Timeout(Duration),

    #[error("Evaluator unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed evaluator response: {0}")]
    Malformed(#[from] ResponseError),

    #[error("Evaluator process error: {0}")]
    Process(#[from] AgentError),
}

/// An opaque scoring service for one evaluator kind
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn kind(&self) -> JudgeKind;

    async fn evaluate(
        &self,
        artifact: &Artifact,
        context: &EvaluationContext<'_>,
    ) -> Result<EvaluatorResponse, EvaluationError>;
}

/// JSON document written to the evaluator command's stdin
#[derive(Serialize)]
struct EvaluateInput<'a> {
    kind: JudgeKind,
    criteria: &'a [String],
    request: &'a ArtifactRequest,
    artifact: &'a Artifact,
    iteration: usize,
    instructions: String,
}

/// Evaluator backed by an external command (typically an LLM CLI wrapper)
pub struct CommandEvaluator {
    kind: JudgeKind,
    program: PathBuf,
    args: Vec<String>,
    config: CommandConfig,
}

impl CommandEvaluator {
    pub fn new(kind: JudgeKind, program: PathBuf, args: Vec<String>, config: CommandConfig) -> Self {
        Self {
            kind,
            program,
            args,
            config,
        }
    }
}

#[async_trait]
impl Evaluator for CommandEvaluator {
    fn kind(&self) -> JudgeKind {
        self.kind
    }

    async fn evaluate(
        &self,
        artifact: &Artifact,
        context: &EvaluationContext<'_>,
    ) -> Result<EvaluatorResponse, EvaluationError> {
        let instructions = JudgePrompts::build_evaluation_prompt(
            self.kind,
            context.criteria,
            context.request,
            artifact,
            context.iteration,
        );
        let input = serde_json::to_string(&EvaluateInput {
            kind: self.kind,
            criteria: context.criteria,
            request: context.request,
            artifact,
            iteration: context.iteration,
            instructions,
        })
        .map_err(|e| EvaluationError::Unavailable(format!("failed to encode input: {}", e)))?;

        debug!(
            kind = %self.kind,
            input_len = input.len(),
            iteration = context.iteration,
            "Running evaluator command"
        );

        let output =
            ProcessSpawner::spawn(&self.program, &self.args, Some(&input), &self.config).await?;

        info!(
            kind = %self.kind,
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Evaluator completed"
        );

        if !output.success() {
            return Err(EvaluationError::Unavailable(format!(
                "evaluator exited with code {}",
                output.exit_code
            )));
        }

        Ok(EvaluatorResponse::parse(&output.stdout)?)
    }
}
