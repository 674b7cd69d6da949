use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the refinement loop. Iterations are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RefinementStarted {
        session_id: String,
        brief: String,
        producer: String,
        evaluators: Vec<String>,
        max_iterations: usize,
    },
    ProducerStarted {
        iteration: usize,
        feedback_items: usize,
    },
    ProducerCompleted {
        iteration: usize,
        artifact_chars: usize,
        duration_secs: f64,
    },
    EvaluationStarted {
        iteration: usize,
        evaluators: usize,
    },
    EvaluatorScored {
        iteration: usize,
        kind: String,
        score: f64,
        passed: bool,
        degraded: bool,
        critical_issues: usize,
    },
    VerdictReached {
        iteration: usize,
        overall_score: f64,
        passed: bool,
        failed_kinds: Vec<String>,
        critical_issues: usize,
        suggestions: usize,
        duration_secs: f64,
    },
    BestAttemptUpdated {
        iteration: usize,
        overall_score: f64,
    },
    RefinementPassed {
        iterations: usize,
        overall_score: f64,
        duration_secs: f64,
    },
    BudgetExhausted {
        iterations: usize,
        best_iteration: usize,
        best_score: f64,
        duration_secs: f64,
    },
    ErrorEncountered {
        iteration: usize,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for refinement events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    console: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            console: true,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            console: true,
            file_writer: Some(Mutex::new(file)),
        })
    }

    /// Stop echoing events to stderr (file output is unaffected)
    pub fn without_console(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RefinementStarted {
                brief,
                producer,
                evaluators,
                max_iterations,
                ..
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "refineloops".bold().bright_white(),
                    " ".repeat(56) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Brief:".dimmed(),
                    Self::truncate_with_padding(brief, 61, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Producer:".dimmed(),
                    Self::truncate_with_padding(producer, 58, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Judges:".dimmed(),
                    Self::truncate_with_padding(&evaluators.join(", "), 60, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Budget:".dimmed(),
                    Self::truncate_with_padding(&format!("{} iterations", max_iterations), 60, 68)
                        .dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::ProducerStarted {
                iteration,
                feedback_items,
            } => {
                let iter_text = format!("─ Iteration {} ", iteration);
                let padding = "─".repeat(67usize.saturating_sub(iter_text.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    iter_text.bright_blue().bold(),
                    format!("{}┐", padding).bright_blue()
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    "PRODUCER".bright_cyan().bold()
                );
                if *feedback_items > 0 {
                    let _ = writeln!(
                        stderr,
                        "    {} {} suggestion(s) carried forward",
                        "↻".dimmed(),
                        feedback_items
                    );
                }
            }
            LogEvent::ProducerCompleted {
                artifact_chars,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} chars ({:.1}s)",
                    "✓".bright_green(),
                    artifact_chars,
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            LogEvent::EvaluationStarted { evaluators, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_magenta(),
                    "JUDGES".bright_magenta().bold(),
                    format!("({} in parallel)", evaluators).dimmed()
                );
            }
            LogEvent::EvaluatorScored {
                kind,
                score,
                passed,
                degraded,
                critical_issues,
                ..
            } => {
                let marker = if *passed {
                    "✓".bright_green()
                } else {
                    "✗".bright_red()
                };
                let detail = if *degraded {
                    "unavailable".bright_red().to_string()
                } else if *critical_issues > 0 {
                    format!("{} critical", critical_issues)
                        .bright_red()
                        .to_string()
                } else {
                    String::new()
                };
                let _ = writeln!(
                    stderr,
                    "    {} {:<10} {:>4.1} {}",
                    marker, kind, score, detail
                );
            }
            LogEvent::VerdictReached {
                overall_score,
                passed,
                failed_kinds,
                critical_issues,
                ..
            } => {
                let line = if *passed {
                    format!("✓ Verdict: PASS ({:.1})", overall_score)
                        .bright_green()
                        .to_string()
                } else {
                    let mut reasons = Vec::new();
                    if !failed_kinds.is_empty() {
                        reasons.push(format!("failed: {}", failed_kinds.join(", ")));
                    }
                    if *critical_issues > 0 {
                        reasons.push(format!("{} critical", critical_issues));
                    }
                    format!("→ Verdict: FAIL ({:.1}) {}", overall_score, reasons.join("; "))
                        .bright_yellow()
                        .to_string()
                };
                let _ = writeln!(stderr);
                let _ = writeln!(stderr, "    {}", line);
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::BestAttemptUpdated { .. } => {
                // Shown in the final summary
            }
            LogEvent::RefinementPassed { .. } => {
                // Handled by the final outcome printing in main.rs
            }
            LogEvent::BudgetExhausted {
                iterations,
                best_iteration,
                best_score,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "{} Iteration budget exhausted ({}); best attempt was iteration {} ({:.1})",
                    "⚠".bright_yellow(),
                    iterations,
                    best_iteration,
                    best_score
                );
            }
            LogEvent::ErrorEncountered { iteration, error } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Error in iteration {}: {}",
                    "✗".bright_red(),
                    iteration,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::RefinementStarted { session_id, .. } => {
                format!("[{}] refine:start {}", timestamp, session_id)
            }
            LogEvent::ProducerStarted { iteration, .. } => {
                format!("[{}] produce:start:{}", timestamp, iteration)
            }
            LogEvent::ProducerCompleted {
                iteration,
                artifact_chars,
                duration_secs,
            } => format!(
                "[{}] produce:done:{} {}c {:.1}s",
                timestamp, iteration, artifact_chars, duration_secs
            ),
            LogEvent::EvaluationStarted {
                iteration,
                evaluators,
            } => format!("[{}] judge:start:{} n={}", timestamp, iteration, evaluators),
            LogEvent::EvaluatorScored {
                iteration,
                kind,
                score,
                passed,
                ..
            } => format!(
                "[{}] judge:{}:{} {:.1} {}",
                timestamp,
                iteration,
                kind,
                score,
                if *passed { "pass" } else { "fail" }
            ),
            LogEvent::VerdictReached {
                iteration,
                overall_score,
                passed,
                ..
            } => format!(
                "[{}] verdict:{} {:.1} {}",
                timestamp,
                iteration,
                overall_score,
                if *passed { "pass" } else { "fail" }
            ),
            LogEvent::BestAttemptUpdated {
                iteration,
                overall_score,
            } => format!("[{}] best:{} {:.1}", timestamp, iteration, overall_score),
            LogEvent::RefinementPassed {
                iterations,
                overall_score,
                duration_secs,
            } => format!(
                "[{}] refine:pass:{} {:.1} {:.1}s",
                timestamp, iterations, overall_score, duration_secs
            ),
            LogEvent::BudgetExhausted {
                iterations,
                best_iteration,
                best_score,
                ..
            } => format!(
                "[{}] refine:limit:{} best={}@{:.1}",
                timestamp, iterations, best_iteration, best_score
            ),
            LogEvent::ErrorEncountered { iteration, error } => {
                format!("[{}] error:{}:{}", timestamp, iteration, error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1); // +1 for trailing │
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
