use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output captured from an external process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// Combined stdout output
    pub stdout: String,
    /// Combined stderr output
    pub stderr: String,
    /// Exit code from the process (-1 when killed by a signal)
    pub exit_code: i32,
    /// Duration of execution
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn new(stdout: String, stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            duration,
        }
    }

    /// Check if the process exited successfully
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last few lines of stderr, for error messages
    pub fn stderr_tail(&self, max_lines: usize) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}
