use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::{Artifact, ArtifactRequest};

/// Errors raised while running an external process
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Process timed out after {0:?}")]
    Timeout(Duration),

    #[error("Process execution failed: {0}")]
    ExecutionFailed(String),
}

/// Errors a producer can surface. Any of these ends the refinement session.
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error(transparent)]
    Process(#[from] AgentError),

    #[error("Producer exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Producer returned an empty artifact")]
    EmptyArtifact,

    #[error("Failed to encode producer input: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Producer failed: {0}")]
    Failed(String),
}

/// Configuration for running an external command
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// Working directory for the child process
    pub working_dir: PathBuf,
    /// Optional timeout (None = no limit)
    pub timeout: Option<Duration>,
    /// Additional environment variables
    pub env_vars: HashMap<String, String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            timeout: None,
            env_vars: HashMap::new(),
        }
    }
}

impl CommandConfig {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_env(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }
}

/// Turns a request plus feedback into a new artifact version.
///
/// Retrying a failed production is the producer's own business: the
/// refinement loop treats any error as fatal for the session.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Human-readable name of the producer
    fn name(&self) -> &str;

    /// Produce the artifact for `iteration` (1-based). `feedback` is `None` on
    /// the first round and carries the prioritized suggestions afterwards.
    async fn produce(
        &self,
        request: &ArtifactRequest,
        feedback: Option<&[String]>,
        iteration: usize,
    ) -> Result<Artifact, ProducerError>;
}
