use crate::error::EvalError;
use crate::leadtime::aggregate::{TOP_N, anomalous_lead_cycles, compute_metrics, top_lead_rows};
use crate::leadtime::histogram::render_histogram;
use crate::leadtime::types::{LeadTimeMetrics, TOP_LEAD_COLUMNS};
use crate::output::{
    HISTOGRAM_FILE, METRICS_FILE, TOP_LEADS_FILE, print_summary, write_metrics_json,
    write_top_leads_csv,
};
use crate::summary::{REQUIRED_EVAL_COLUMNS, load_summary};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_SUMMARY: &str = "anomaly_summary.csv";
pub const DEFAULT_OUTDIR: &str = "outputs";

/// Files written by a successful evaluation.
#[derive(Debug)]
pub struct EvalReport {
    pub metrics: LeadTimeMetrics,
    pub metrics_path: PathBuf,
    pub top_leads_path: PathBuf,
    /// `None` when no cell had an anomaly before end-of-life.
    pub histogram_path: Option<PathBuf>,
}

/// Evaluates lead-time detection for the summary table at `summary`,
/// writing the metrics document, the top-5 table and the histogram into `outdir`.
///
/// Progress and the final summary are printed to stdout. Every output file
/// is overwritten; a histogram left by an earlier run is removed when there
/// is nothing to plot.
#[tracing::instrument(skip_all, fields(summary = %summary.display(), outdir = %outdir.display()))]
pub fn evaluate(summary: &Path, outdir: &Path) -> Result<EvalReport> {
    let input_file = std::path::absolute(summary)?;
    let output_dir = std::path::absolute(outdir)?;

    println!("Loading {}...", input_file.display());
    println!("Output directory: {}", output_dir.display());

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    if !input_file.exists() {
        return Err(EvalError::SummaryNotFound(input_file).into());
    }

    let table = load_summary(&input_file)?;
    table.require_columns(&REQUIRED_EVAL_COLUMNS)?;

    let metrics = compute_metrics(&table.rows);
    info!(
        cells = metrics.cells,
        cells_with_anomalies = metrics.cells_with_anomalies,
        mean_lead_cycles = metrics.mean_lead_cycles,
        median_lead_cycles = metrics.median_lead_cycles,
        "Computed lead-time metrics"
    );

    let metrics_path = output_dir.join(METRICS_FILE);
    write_metrics_json(&metrics_path, &metrics)?;
    println!("Saved metrics to {}", metrics_path.display());

    // the projection needs two more columns than the metrics do
    table.require_columns(&TOP_LEAD_COLUMNS)?;
    let top = top_lead_rows(&table.rows, TOP_N);
    let top_leads_path = output_dir.join(TOP_LEADS_FILE);
    write_top_leads_csv(&top_leads_path, &top)?;
    println!("Saved top-5 lead times to {}", top_leads_path.display());

    let leads = anomalous_lead_cycles(&table.rows);
    let histogram = output_dir.join(HISTOGRAM_FILE);
    let histogram_path = if leads.is_empty() {
        if histogram.exists() {
            fs::remove_file(&histogram)
                .with_context(|| format!("removing stale {}", histogram.display()))?;
            debug!(path = %histogram.display(), "Removed stale histogram");
        }
        println!("No anomalies detected; skipping histogram.");
        None
    } else {
        render_histogram(&leads, &histogram)?;
        println!("Saved histogram to {}", histogram.display());
        Some(histogram)
    };

    print_summary(&metrics);

    Ok(EvalReport {
        metrics,
        metrics_path,
        top_leads_path,
        histogram_path,
    })
}
