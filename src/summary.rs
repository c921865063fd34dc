//! Loading of the per-cell anomaly summary table produced by the notebook.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, de};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::error::EvalError;

/// Columns the evaluator cannot work without.
pub const REQUIRED_EVAL_COLUMNS: [&str; 3] = ["battery_id", "lead_cycles", "total_cycles"];

/// Full schema written by the detection notebook.
pub const SUMMARY_COLUMNS: [&str; 8] = [
    "battery_id",
    "baseline_capacity",
    "eol_threshold",
    "eol_test_id",
    "first_anomaly_test_id",
    "lead_cycles",
    "anomaly_count",
    "total_cycles",
];

/// Cell values treated as missing, in addition to an empty cell.
const MISSING_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None", "<NA>"];

/// One battery cell from `anomaly_summary.csv`.
///
/// Numeric fields are optional: an absent column, an empty cell or a
/// missing-value marker all deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnomalySummaryRow {
    #[serde(default)]
    pub battery_id: String,
    #[serde(default, deserialize_with = "optional_number")]
    pub baseline_capacity: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub eol_threshold: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub eol_test_id: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub first_anomaly_test_id: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub lead_cycles: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub anomaly_count: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub total_cycles: Option<f64>,
}

impl AnomalySummaryRow {
    /// Lead cycles when an anomaly preceded end-of-life.
    pub fn anomalous_lead(&self) -> Option<f64> {
        self.lead_cycles.filter(|lead| *lead > 0.0)
    }
}

/// The header and rows of a summary table, in file order.
#[derive(Debug, Default)]
pub struct SummaryTable {
    pub columns: Vec<String>,
    pub rows: Vec<AnomalySummaryRow>,
}

impl SummaryTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Returns the entries of `required` absent from the header, in the order given.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect()
    }

    /// Fails with [`EvalError::MissingColumns`] unless every `required` column is present.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), EvalError> {
        let missing = self.missing_columns(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EvalError::MissingColumns(missing))
        }
    }
}

/// Reads a summary table from a CSV file on disk.
pub fn load_summary(path: &Path) -> Result<SummaryTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let table = read_summary(file).with_context(|| format!("reading {}", path.display()))?;
    debug!(
        path = %path.display(),
        rows = table.rows.len(),
        columns = table.columns.len(),
        "Loaded summary table"
    );
    Ok(table)
}

/// Reads a summary table from any CSV source with a header row.
pub fn read_summary<R: Read>(reader: R) -> Result<SummaryTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns = rdr
        .headers()?
        .iter()
        .filter(|h| !h.is_empty())
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: AnomalySummaryRow = result?;
        rows.push(record);
    }

    Ok(SummaryTable { columns, rows })
}

/// Validates that the summary table at `path` carries the full notebook schema.
pub fn check_summary(path: &Path) -> Result<SummaryTable> {
    if !path.exists() {
        return Err(EvalError::SummaryNotFound(path.to_path_buf()).into());
    }
    let table = load_summary(path)?;
    table.require_columns(&SUMMARY_COLUMNS)?;
    Ok(table)
}

fn is_missing_marker(raw: &str) -> bool {
    raw.is_empty() || MISSING_MARKERS.contains(&raw)
}

fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None => Ok(None),
        Some(value) if is_missing_marker(value) => Ok(None),
        Some(value) => match value.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Some(number)),
            _ => Err(de::Error::custom(format!("invalid number `{value}`"))),
        },
    }
}
