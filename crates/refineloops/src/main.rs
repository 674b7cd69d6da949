mod config;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use refineloops_agent::{ArtifactRequest, CommandProducer, Producer};
use refineloops_core::{EngineConfig, RefinementController, RefinementError, RefinementOutcome};
use refineloops_judge::{CommandEvaluator, Evaluator, EvaluatorInvoker, JudgeKind, ScoringConfig};
use refineloops_logging::{init_tracing, LogFormat, Logger};

use config::{parse_evaluator_flag, CommandSpec, ProjectConfig};

/// Exit code for a run stopped with Ctrl+C
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "refineloops",
    about = "Evaluate-and-refine loop for generated brand artwork",
    version,
    author
)]
struct Cli {
    /// Design brief (or reads from brief.md if not provided)
    #[arg(short = 'p', long)]
    brief: Option<String>,

    /// Path to brief file (default: ./brief.md)
    #[arg(long, default_value = "brief.md")]
    brief_file: PathBuf,

    /// Extra request parameters as a JSON object
    #[arg(long)]
    parameters: Option<String>,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Config file (default: ./refineloops.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Producer command
    #[arg(long)]
    producer: Option<PathBuf>,

    /// Evaluator command as KIND=COMMAND (repeatable)
    #[arg(short, long = "evaluator", value_parser = parse_evaluator_flag)]
    evaluators: Vec<(JudgeKind, PathBuf)>,

    /// Maximum refinement rounds
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Per-call evaluator timeout in seconds
    #[arg(long)]
    evaluator_timeout: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also append events as JSON lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Tracing level for diagnostics (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show the resolved wiring without executing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

/// Everything needed to build the engine, after merging file and flags
struct Wiring {
    producer: CommandSpec,
    evaluators: BTreeMap<JudgeKind, CommandSpec>,
    engine: EngineConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let request = get_request(&cli, &working_dir)?;

    let project_config = match &cli.config {
        Some(path) => Some(ProjectConfig::load_from(path)?),
        None => ProjectConfig::load(&working_dir)?,
    };
    let wiring = resolve_wiring(&cli, project_config.unwrap_or_default())?;

    if cli.dry_run {
        print_dry_run(&request, &working_dir, &wiring);
        return Ok(());
    }

    let logger = match &cli.log_file {
        Some(path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let controller = build_controller(&wiring, &working_dir, Arc::new(logger))?;

    // Dropping the run future kills any in-flight child processes
    let result = tokio::select! {
        result = controller.run(request) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n{}", "Interrupted. Abandoning refinement.".yellow());
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            print_failure(&err);
            return Err(err).context("Refinement failed");
        }
    };

    if cli.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        print_outcome(&outcome);
    }

    std::process::exit(outcome.exit_code());
}

fn get_request(cli: &Cli, working_dir: &Path) -> Result<ArtifactRequest> {
    let brief = get_brief(cli, working_dir)?;
    let mut request = ArtifactRequest::new(brief);

    if let Some(raw) = &cli.parameters {
        let parameters: serde_json::Value =
            serde_json::from_str(raw).context("--parameters must be valid JSON")?;
        if !parameters.is_object() {
            anyhow::bail!("--parameters must be a JSON object");
        }
        request = request.with_parameters(parameters);
    }

    Ok(request)
}

fn get_brief(cli: &Cli, working_dir: &Path) -> Result<String> {
    // Prefer --brief flag
    if let Some(ref brief) = cli.brief {
        return Ok(brief.clone());
    }

    let brief_path = if cli.brief_file.is_absolute() {
        cli.brief_file.clone()
    } else {
        working_dir.join(&cli.brief_file)
    };

    if brief_path.exists() {
        let content = std::fs::read_to_string(&brief_path).context("Failed to read brief file")?;
        Ok(content.trim().to_string())
    } else {
        anyhow::bail!(
            "No brief provided. Use --brief or create a {} file",
            cli.brief_file.display()
        )
    }
}

/// Merge the config file with CLI flags; flags win
fn resolve_wiring(cli: &Cli, project: ProjectConfig) -> Result<Wiring> {
    let producer = match (&cli.producer, project.producer) {
        (Some(command), _) => CommandSpec::new(command.clone()),
        (None, Some(spec)) => spec,
        (None, None) => anyhow::bail!(
            "No producer configured. Use --producer or add [producer] to {}",
            config::CONFIG_FILE_NAME
        ),
    };

    let mut evaluators = project.evaluators;
    for (kind, command) in &cli.evaluators {
        evaluators.insert(*kind, CommandSpec::new(command.clone()));
    }
    if evaluators.is_empty() {
        anyhow::bail!(
            "No evaluators configured. Use --evaluator KIND=COMMAND or add [evaluators.<kind>] to {}",
            config::CONFIG_FILE_NAME
        );
    }

    let mut scoring = ScoringConfig::canonical();
    if let Some(secs) = cli.evaluator_timeout {
        scoring = scoring.with_evaluator_timeout(Duration::from_secs(secs));
    } else if let Some(timeout) = project.evaluator_timeout {
        scoring = scoring.with_evaluator_timeout(timeout);
    }
    if let Some(threshold) = project.overall_threshold {
        scoring = scoring.with_overall_threshold(threshold);
    }

    let mut engine = EngineConfig::new(Arc::new(scoring));
    if let Some(max) = cli.max_iterations.or(project.max_iterations) {
        engine = engine.with_max_iterations(max);
    }
    engine.validate().context("Invalid engine configuration")?;

    Ok(Wiring {
        producer,
        evaluators,
        engine,
    })
}

fn build_controller(
    wiring: &Wiring,
    working_dir: &Path,
    logger: Arc<Logger>,
) -> Result<RefinementController> {
    let producer: Arc<dyn Producer> = Arc::new(CommandProducer::new(
        wiring.producer.command.clone(),
        wiring.producer.args.clone(),
        wiring.producer.command_config(working_dir),
    ));

    let evaluators: Vec<Arc<dyn Evaluator>> = wiring
        .evaluators
        .iter()
        .map(|(kind, spec)| {
            Arc::new(CommandEvaluator::new(
                *kind,
                spec.command.clone(),
                spec.args.clone(),
                spec.command_config(working_dir),
            )) as Arc<dyn Evaluator>
        })
        .collect();

    let invoker = EvaluatorInvoker::new(wiring.engine.scoring.clone(), evaluators)
        .context("Invalid evaluator configuration")?;

    RefinementController::new(producer, invoker, wiring.engine.clone(), logger)
        .context("Failed to build refinement controller")
}

fn print_dry_run(request: &ArtifactRequest, working_dir: &Path, wiring: &Wiring) {
    let brief = &request.brief;
    println!("=== Dry Run ===");
    println!(
        "Brief: {}",
        if brief.chars().count() > 100 {
            format!("{}...", brief.chars().take(100).collect::<String>())
        } else {
            brief.clone()
        }
    );
    println!("Working dir: {}", working_dir.display());
    println!("Producer: {}", wiring.producer.display());
    for (kind, spec) in &wiring.evaluators {
        let weight = wiring.engine.scoring.weight(*kind).unwrap_or(0.0);
        println!("Evaluator {} (weight {:.2}): {}", kind, weight, spec.display());
    }
    println!("Max iterations: {}", wiring.engine.max_iterations);
    println!(
        "Evaluator timeout: {}s",
        wiring.engine.scoring.evaluator_timeout.as_secs()
    );
    println!(
        "Overall threshold: {:.1}",
        wiring.engine.scoring.overall_threshold
    );
}

fn print_outcome(outcome: &RefinementOutcome) {
    let verdict = outcome.verdict();
    match outcome {
        RefinementOutcome::Passed {
            iterations,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== PASSED ===".green().bold());
            eprintln!("Iterations: {}", iterations);
            eprintln!("Overall score: {:.1}", verdict.overall_score());
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        RefinementOutcome::BestEffort {
            iterations,
            best_iteration,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== BEST EFFORT ===".yellow().bold());
            eprintln!("No attempt passed in {} iteration(s)", iterations);
            eprintln!(
                "Best attempt: iteration {} ({})",
                best_iteration,
                verdict.short_description()
            );
            eprintln!("Duration: {:.1}s", total_duration_secs);
            if !verdict.failed_kinds().is_empty() {
                let failed: Vec<String> =
                    verdict.failed_kinds().iter().map(|k| k.to_string()).collect();
                eprintln!("Failed: {}", failed.join(", "));
            }
            for issue in verdict.critical_issues() {
                eprintln!("  {} {}", "!".red(), issue);
            }
        }
    }

    // The artifact itself goes to stdout so it can be redirected
    println!("{}", outcome.artifact().content);
}

fn print_failure(err: &RefinementError) {
    eprintln!();
    eprintln!("{}", "=== FAILED ===".red().bold());
    let completed = err.history().len();
    if completed > 0 {
        eprintln!("Completed rounds before failure: {}", completed);
    }
}
