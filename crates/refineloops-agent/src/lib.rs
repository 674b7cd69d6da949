mod artifact;
mod command;
mod output;
mod spawner;
mod traits;

pub use artifact::{Artifact, ArtifactRequest};
pub use command::CommandProducer;
pub use output::ProcessOutput;
pub use spawner::ProcessSpawner;
pub use traits::{AgentError, CommandConfig, Producer, ProducerError};
