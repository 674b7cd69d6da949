use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{Artifact, ArtifactRequest, CommandConfig, ProcessSpawner, Producer, ProducerError};

/// JSON document written to the producer's stdin
#[derive(Serialize)]
struct ProduceInput<'a> {
    request: &'a ArtifactRequest,
    feedback: Option<&'a [String]>,
    iteration: usize,
}

/// Structured form of the producer's stdout
#[derive(Deserialize)]
struct ProducedArtifact {
    content: String,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Producer backed by an external command.
///
/// The command receives `{"request", "feedback", "iteration"}` as JSON on stdin
/// and prints either `{"content", "reasoning"}` JSON or the raw artifact.
pub struct CommandProducer {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    config: CommandConfig,
}

impl CommandProducer {
    pub fn new(program: PathBuf, args: Vec<String>, config: CommandConfig) -> Self {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self {
            name,
            program,
            args,
            config,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn parse_output(stdout: &str, iteration: usize) -> Result<Artifact, ProducerError> {
        let trimmed = stdout.trim();

        let artifact = match serde_json::from_str::<ProducedArtifact>(trimmed) {
            Ok(produced) => Artifact {
                iteration,
                content: produced.content,
                reasoning: produced.reasoning,
            },
            Err(_) => {
                debug!("Producer output is not JSON, using raw text");
                Artifact::new(iteration, trimmed)
            }
        };

        if artifact.content.trim().is_empty() {
            return Err(ProducerError::EmptyArtifact);
        }
        Ok(artifact)
    }
}

#[async_trait]
impl Producer for CommandProducer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(
        &self,
        request: &ArtifactRequest,
        feedback: Option<&[String]>,
        iteration: usize,
    ) -> Result<Artifact, ProducerError> {
        let input = serde_json::to_string(&ProduceInput {
            request,
            feedback,
            iteration,
        })?;

        debug!(
            producer = self.name(),
            iteration,
            feedback_items = feedback.map_or(0, |f| f.len()),
            "Executing producer"
        );

        let output =
            ProcessSpawner::spawn(&self.program, &self.args, Some(&input), &self.config).await?;

        info!(
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Producer completed"
        );

        if !output.success() {
            return Err(ProducerError::NonZeroExit {
                code: output.exit_code,
                stderr: output.stderr_tail(20),
            });
        }

        Self::parse_output(&output.stdout, iteration)
    }
}
