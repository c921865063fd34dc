//! End-to-end execution of the analysis notebook.
//!
//! [`NotebookExecutor`] is the async trait that runs every cell of a notebook
//! and hands back the executed document.
//! [`NbconvertExecutor`] implements [`NotebookExecutor`] with Jupyter's `nbconvert`.
//! [`run_notebook`] checks the inputs, executes, and writes the result back in place.

mod document;
mod nbconvert;
mod runner;

pub use document::NotebookDocument;
pub use nbconvert::NbconvertExecutor;
pub use runner::{NotebookRun, RunnerOptions, run_notebook};

use crate::error::NotebookError;
use std::path::Path;
use std::time::Duration;

/// Default notebook executed by `run-notebook`.
pub const DEFAULT_NOTEBOOK: &str = "Battery_Anomaly_Detection.ipynb";
/// Cleaned cycling data the notebook reads.
pub const DEFAULT_DATA: &str = "Battery_Data_Cleaned.csv";
pub const DEFAULT_KERNEL: &str = "python3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 1800;

/// Executes every cell of a notebook and returns the executed document bytes.
///
/// `cell_timeout` limits each cell, not the run as a whole.
#[async_trait::async_trait]
pub trait NotebookExecutor: Send + Sync {
    async fn execute(&self, path: &Path, cell_timeout: Duration)
    -> Result<Vec<u8>, NotebookError>;
}
