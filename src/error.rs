//! Error taxonomy for the evaluator and the notebook runner.
//!
//! Both enums are surfaced through `anyhow` at the CLI boundary, where `main`
//! prints them as `Error: <message>` and exits with status 1.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures detected while evaluating a summary table.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Summary file not found: {}", .0.display())]
    SummaryNotFound(PathBuf),

    /// One or more columns the evaluation needs are absent from the header.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Failures while executing a notebook end-to-end.
#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("{} not found in current directory", .0.display())]
    NotFound(PathBuf),

    #[error(
        "Missing required package: `{program}` could not be started. \
         Install with: pip install jupyter nbconvert ipykernel"
    )]
    MissingDependency {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error executing notebook ({status}): {stderr}")]
    ExecutionFailed { status: String, stderr: String },

    #[error("Error executing notebook: exceeded maximum runtime of {0:?}")]
    Timeout(Duration),

    #[error("Invalid notebook document: {0}")]
    InvalidNotebook(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
