//! Project configuration file support for refineloops.
//!
//! Loads configuration from `refineloops.toml` in the working directory, or
//! from the user config directory when the project has none.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use refineloops_agent::CommandConfig;
use refineloops_judge::JudgeKind;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "refineloops.toml";

/// Project-level configuration loaded from `refineloops.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Rounds before settling for the best attempt
    pub max_iterations: Option<usize>,
    /// Per-call evaluator deadline, e.g. "90s" or "2m"
    #[serde(default, with = "humantime_serde")]
    pub evaluator_timeout: Option<Duration>,
    /// Bar the weighted overall score must reach
    pub overall_threshold: Option<f64>,
    pub producer: Option<CommandSpec>,
    /// One command per evaluator kind
    #[serde(default)]
    pub evaluators: BTreeMap<JudgeKind, CommandSpec>,
}

/// An external command and how to run it
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    pub command: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            timeout: None,
            env: HashMap::new(),
        }
    }

    /// Process settings for running this command from `working_dir`
    pub fn command_config(&self, working_dir: &Path) -> CommandConfig {
        let mut config = CommandConfig::new(working_dir.to_path_buf());
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        for (key, value) in &self.env {
            config = config.with_env(key.clone(), value.clone());
        }
        config
    }

    /// Command line as typed, for dry runs and summaries
    pub fn display(&self) -> String {
        let mut parts = vec![self.command.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

impl ProjectConfig {
    /// Load configuration for `working_dir`.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if the project or global file exists and parses
    /// - `Ok(None)` if neither file exists
    /// - `Err(...)` if a file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let project_path = working_dir.join(CONFIG_FILE_NAME);
        if project_path.exists() {
            return Self::load_from(&project_path).map(Some);
        }

        match global_config_path() {
            Some(path) if path.exists() => Self::load_from(&path).map(Some),
            _ => Ok(None),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// `~/.config/refineloops/config.toml` or the platform equivalent
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("refineloops").join("config.toml"))
}

/// Parse a `--evaluator kind=command` flag
pub fn parse_evaluator_flag(value: &str) -> Result<(JudgeKind, PathBuf), String> {
    let (kind, command) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KIND=COMMAND, got '{}'", value))?;

    let kind: JudgeKind = kind.trim().parse()?;
    let command = command.trim();
    if command.is_empty() {
        return Err(format!("missing command for evaluator '{}'", kind));
    }
    Ok((kind, PathBuf::from(command)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        // A global file may exist on the test machine; only the project lookup is asserted.
        assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
        assert!(ProjectConfig::load(dir.path()).is_ok());
    }

    #[test]
    fn test_full_config_parses() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
max_iterations = 3
evaluator_timeout = "90s"
overall_threshold = 7.5

[producer]
command = "./bin/draw"
args = ["--style", "flat"]
timeout = "5m"

[evaluators.aesthetic]
command = "./bin/judge"
args = ["aesthetic"]

[evaluators.brand_fit]
command = "./bin/judge"
env = { JUDGE_MODEL = "large" }
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.max_iterations, Some(3));
        assert_eq!(config.evaluator_timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.overall_threshold, Some(7.5));

        let producer = config.producer.unwrap();
        assert_eq!(producer.command, PathBuf::from("./bin/draw"));
        assert_eq!(producer.timeout, Some(Duration::from_secs(300)));
        assert_eq!(producer.display(), "./bin/draw --style flat");

        assert_eq!(config.evaluators.len(), 2);
        let brand = &config.evaluators[&JudgeKind::BrandFit];
        assert_eq!(brand.env.get("JUDGE_MODEL").map(String::as_str), Some("large"));
        assert!(brand.args.is_empty());
    }

    #[test]
    fn test_unknown_field_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "iterations = 3\n").unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_unknown_evaluator_kind_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[evaluators.vibes]\ncommand = \"judge\"\n",
        )
        .unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_command_config_carries_timeout_and_env() {
        let mut spec = CommandSpec::new("judge");
        spec.timeout = Some(Duration::from_secs(30));
        spec.env.insert("MODE".into(), "strict".into());

        let config = spec.command_config(Path::new("/work"));
        assert_eq!(config.working_dir, PathBuf::from("/work"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.env_vars.get("MODE").map(String::as_str), Some("strict"));
    }

    #[test]
    fn test_parse_evaluator_flag() {
        let (kind, command) = parse_evaluator_flag("technical=./bin/svglint").unwrap();
        assert_eq!(kind, JudgeKind::Technical);
        assert_eq!(command, PathBuf::from("./bin/svglint"));

        assert!(parse_evaluator_flag("technical").is_err());
        assert!(parse_evaluator_flag("technical=").is_err());
        assert!(parse_evaluator_flag("vibes=./judge").is_err());
    }
}
