use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::NotebookError;
use crate::notebook::{
    DEFAULT_DATA, DEFAULT_NOTEBOOK, DEFAULT_TIMEOUT_SECS, NotebookDocument, NotebookExecutor,
};

const RULE_WIDTH: usize = 60;

/// Inputs of a notebook run.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub notebook: PathBuf,
    /// Companion data file; only checked for presence.
    pub data: PathBuf,
    pub outdir: PathBuf,
    /// Per-cell execution limit.
    pub timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            notebook: PathBuf::from(DEFAULT_NOTEBOOK),
            data: PathBuf::from(DEFAULT_DATA),
            outdir: PathBuf::from(crate::leadtime::evaluator::DEFAULT_OUTDIR),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Outcome of a successful notebook run.
#[derive(Debug)]
pub struct NotebookRun {
    pub notebook: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub code_cells: usize,
    pub executed_cells: usize,
}

/// Executes the notebook end-to-end and writes the executed document back
/// over the original file.
///
/// A missing data file only produces a warning. Nothing is retried: the
/// first failure is returned and the notebook on disk is left untouched.
#[tracing::instrument(skip(executor), fields(notebook = %options.notebook.display()))]
pub async fn run_notebook(
    executor: &dyn NotebookExecutor,
    options: &RunnerOptions,
) -> Result<NotebookRun, NotebookError> {
    if !options.notebook.exists() {
        return Err(NotebookError::NotFound(options.notebook.clone()));
    }

    if !options.data.exists() {
        warn!(data = %options.data.display(), "Data file missing");
        println!(
            "Warning: {} not found - notebook may fail if it requires this file",
            options.data.display()
        );
    }

    fs::create_dir_all(&options.outdir)?;
    println!("Outputs directory ready: {}", options.outdir.display());

    let source = NotebookDocument::parse(&fs::read(&options.notebook)?)?;
    info!(
        cells = source.cell_count(),
        code_cells = source.code_cell_count(),
        nbformat = source.nbformat,
        "Notebook loaded"
    );

    println!("\nExecuting {}...", options.notebook.display());
    println!("{}", "=".repeat(RULE_WIDTH));

    let started_at = Utc::now();
    let executed = executor.execute(&options.notebook, options.timeout).await?;
    let document = NotebookDocument::parse(&executed)?;
    fs::write(&options.notebook, &executed)?;
    let finished_at = Utc::now();

    info!(
        executed_cells = document.executed_cell_count(),
        elapsed_secs = (finished_at - started_at).num_seconds(),
        "Notebook executed and saved"
    );

    println!("{}", "=".repeat(RULE_WIDTH));
    println!("Successfully executed {}", options.notebook.display());
    println!("Check {}/ directory for results", options.outdir.display());
    println!("Check anomaly_summary.csv for summary data");
    println!("Check report.html for HTML report");

    Ok(NotebookRun {
        notebook: options.notebook.clone(),
        started_at,
        finished_at,
        code_cells: document.code_cell_count(),
        executed_cells: document.executed_cell_count(),
    })
}
