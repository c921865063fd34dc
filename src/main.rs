//! CLI entry point for the battery lead-time tool.
//!
//! Provides subcommands for executing the anomaly-detection notebook,
//! evaluating the lead-time summary it produces, and validating that summary.

use anyhow::{Context, Result};
use battery_leadtime::leadtime::evaluator::{DEFAULT_OUTDIR, DEFAULT_SUMMARY, evaluate};
use battery_leadtime::notebook::{
    DEFAULT_DATA, DEFAULT_KERNEL, DEFAULT_NOTEBOOK, DEFAULT_TIMEOUT_SECS, NbconvertExecutor,
    RunnerOptions, run_notebook,
};
use battery_leadtime::runtime::build_runtime;
use battery_leadtime::summary::check_summary;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "battery_leadtime")]
#[command(about = "Run the battery anomaly notebook and evaluate lead-time detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the anomaly-detection notebook in place
    RunNotebook {
        /// Notebook to execute and overwrite with its outputs
        #[arg(long, default_value = DEFAULT_NOTEBOOK)]
        notebook: PathBuf,

        /// Data file the notebook reads (only checked for presence)
        #[arg(long, default_value = DEFAULT_DATA)]
        data: PathBuf,

        /// Directory the notebook writes its results to
        #[arg(long, default_value = DEFAULT_OUTDIR)]
        outdir: PathBuf,

        /// Upper bound on each cell's execution time, in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,

        /// Upper bound on the whole run, in seconds (unbounded when omitted)
        #[arg(long)]
        max_runtime_secs: Option<u64>,

        /// Jupyter kernel used to run the cells
        #[arg(long, default_value = DEFAULT_KERNEL)]
        kernel: String,
    },
    /// Compute lead-time metrics, the top-5 table and the histogram
    EvalLeadtime {
        /// Path to anomaly_summary.csv
        #[arg(long, default_value = DEFAULT_SUMMARY)]
        summary: PathBuf,

        /// Directory to write metrics and plots
        #[arg(long, default_value = DEFAULT_OUTDIR)]
        outdir: PathBuf,
    },
    /// Check that the summary table carries every column the notebook writes
    CheckSummary {
        /// Path to anomaly_summary.csv
        #[arg(long, default_value = DEFAULT_SUMMARY)]
        summary: PathBuf,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();

    let _file_guard = match init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = build_runtime()
        .context("building async runtime")
        .and_then(|runtime| runtime.block_on(dispatch(cli.command)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/battery_leadtime.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("battery_leadtime.log"));

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(log_file_name.to_string_lossy().into_owned())
        .build(log_dir)
        .with_context(|| format!("opening log file in {}", log_dir.display()))?;
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()?;

    Ok(file_guard)
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::RunNotebook {
            notebook,
            data,
            outdir,
            timeout_secs,
            max_runtime_secs,
            kernel,
        } => {
            let executor = NbconvertExecutor::from_env(kernel)
                .with_max_runtime(max_runtime_secs.map(Duration::from_secs));
            let options = RunnerOptions {
                notebook,
                data,
                outdir,
                timeout: Duration::from_secs(timeout_secs),
            };
            info!(
                program = executor.program(),
                timeout_secs,
                max_runtime = ?executor.max_runtime(),
                "Running notebook"
            );

            let run = run_notebook(&executor, &options).await?;
            info!(
                notebook = %run.notebook.display(),
                started_at = %run.started_at,
                finished_at = %run.finished_at,
                executed_cells = run.executed_cells,
                code_cells = run.code_cells,
                "Notebook run complete"
            );
        }
        Commands::EvalLeadtime { summary, outdir } => {
            let report = evaluate(&summary, &outdir)?;
            info!(
                metrics = %report.metrics_path.display(),
                top_leads = %report.top_leads_path.display(),
                histogram = report.histogram_path.is_some(),
                "Evaluation complete"
            );
        }
        Commands::CheckSummary { summary } => {
            let path = std::path::absolute(&summary)?;
            let table = check_summary(&path)?;
            println!(
                "Summary table OK: {} ({} rows)",
                path.display(),
                table.rows.len()
            );
        }
    }

    Ok(())
}
