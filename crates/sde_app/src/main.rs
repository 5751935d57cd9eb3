//! Sage Dialog Enhancer - CLI batch runner
//!
//! Thin consumer of `sde_core`: loads settings, runs one batch over a
//! root directory, streams job log lines to the terminal, and prints
//! the final report. A GUI can sit on the same core; nothing here is
//! required by it.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sde_core::config::{validate, Settings};
use sde_core::models::JobOutcome;
use sde_core::orchestrator::BatchRunner;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "sage-dialog-enhancer")]
#[command(about = "Batch-enhance spoken dialogue in video files")]
#[command(version)]
struct Args {
    /// Root directory containing video files
    root: PathBuf,

    /// Settings file (TOML); defaults are used when omitted
    #[arg(short, long, env = "SDE_CONFIG")]
    config: Option<PathBuf>,

    /// Replace existing output files instead of skipping them
    #[arg(long)]
    overwrite: bool,

    /// Maximum number of files encoded at once
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    let raw_settings = load_settings(&args)?;

    // App log goes to a file under the root's log folder; job log lines
    // are streamed to the terminal by the line callback below.
    let log_dir = args.root.join(&raw_settings.logging.logs_folder);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log folder {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "enhancer.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sde_core=info,sde_app=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    // Validate after the subscriber is up so clamp warnings are visible.
    let settings = validate(raw_settings).context("invalid settings")?;

    info!("starting batch over {}", args.root.display());

    let mut runner = BatchRunner::new(&args.root, settings)
        .with_line_callback(Arc::new(|line: &str| println!("{}", line)));

    let report = runner.run().context("batch aborted")?;

    let summary = report.summary();
    println!();
    println!("Batch {}:", runner.state());
    for result in &report.results {
        let name = result
            .input_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| result.input_path.display().to_string());
        match result.outcome {
            JobOutcome::Success => {
                let output = result
                    .output_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("  [Success] {} -> {}", name, output);
            }
            JobOutcome::Skipped => println!("  [Skipped] {} ({})", name, result.detail),
            JobOutcome::Failed => {
                println!("  [Failed]  {}", name);
                for line in result.detail.lines() {
                    println!("            {}", line);
                }
            }
        }
    }
    println!(
        "{} succeeded, {} skipped, {} failed of {} attempted",
        summary.succeeded, summary.skipped, summary.failed, summary.total
    );

    if summary.failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Load settings from the optional TOML file and apply CLI overrides.
fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file {}", path.display()))?;
            Settings::from_toml_str(&content)
                .with_context(|| format!("failed to parse settings file {}", path.display()))?
        }
        None => Settings::default(),
    };

    if args.overwrite {
        settings.output.overwrite = true;
    }
    if let Some(jobs) = args.jobs {
        settings.execution.max_concurrent_jobs = jobs;
    }

    Ok(settings)
}
