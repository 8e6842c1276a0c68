//! CLI entrypoint for the apicompat harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use apicompat_harness::structured_log::{LogEmitter, validate_log_file};
use apicompat_harness::{CompatRunner, HarnessConfig};

/// API compatibility checks between a baseline and its candidates.
#[derive(Debug, Parser)]
#[command(name = "apicompat")]
#[command(about = "Compare API surfaces and report compatibility differences")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare a baseline surface against one or more candidate surfaces.
    Compare {
        /// Baseline surface JSON path.
        #[arg(long)]
        left: PathBuf,
        /// Candidate surface JSON path (repeat for several candidates).
        #[arg(long, required = true)]
        right: Vec<PathBuf>,
        /// Optional harness config JSON path.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output report path (JSON). Printed to stdout when omitted.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Output markdown summary path.
        #[arg(long)]
        markdown: Option<PathBuf>,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Compare assemblies on worker threads.
        #[arg(long)]
        parallel: bool,
        /// Optional fixed timestamp string for deterministic report generation.
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Validate a structured JSONL log produced by `compare`.
    ValidateLog {
        /// Structured JSONL log path.
        #[arg(long)]
        log: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Compare {
            left,
            right,
            config,
            report,
            markdown,
            log,
            parallel,
            timestamp,
        } => {
            let mut harness_config = match &config {
                Some(path) => HarnessConfig::from_file(path)?,
                None => HarnessConfig::default(),
            }
            .with_env_overrides();
            harness_config.parallel |= parallel;

            let run_id = format!("run-{}", std::process::id());
            let mut emitter = match &log {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    LogEmitter::to_file(path, "apicompat", &run_id)?
                }
                None => LogEmitter::to_buffer("apicompat", &run_id),
            };

            eprintln!(
                "Comparing {} against {} candidate(s)",
                left.display(),
                right.len()
            );
            let mut runner = CompatRunner::new(harness_config);
            if let Some(ts) = timestamp {
                runner = runner.with_timestamp(ts);
            }
            let compat = runner.run_files(&left, &right, &mut emitter)?;

            let body = compat.to_json()?;
            if let Some(path) = report {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, body)?;
                eprintln!("Wrote report to {}", path.display());
            } else {
                println!("{body}");
            }
            if let Some(path) = markdown {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, compat.to_markdown())?;
                eprintln!("Wrote markdown summary to {}", path.display());
            }

            eprintln!(
                "{} difference(s), {} actionable",
                compat.summary.total, compat.summary.actionable
            );
            if !compat.is_compatible() {
                return Err(format!(
                    "API compatibility check failed: {} actionable difference(s)",
                    compat.summary.actionable
                )
                .into());
            }
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("line {}: {}: {}", err.line_number, err.field, err.message);
            }
            if !errors.is_empty() {
                return Err(format!(
                    "Log validation failed: {} error(s) in {lines} line(s)",
                    errors.len()
                )
                .into());
            }
            eprintln!("{} valid line(s) in {}", lines, log.display());
        }
    }

    Ok(())
}
