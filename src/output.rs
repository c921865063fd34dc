//! Output formatting and persistence for lead-time results.
//!
//! Writes the metrics JSON document and the top-5 CSV, and renders the
//! console summary.

use anyhow::{Context, Result};
use csv::{Terminator, WriterBuilder};
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

use crate::leadtime::types::{LeadTimeMetrics, TOP_LEAD_COLUMNS, TopLeadTable};

pub const METRICS_FILE: &str = "lead_time_metrics.json";
pub const TOP_LEADS_FILE: &str = "lead_time_top5.csv";
pub const HISTOGRAM_FILE: &str = "lead_time_histogram.png";

/// Writes [`LeadTimeMetrics`] as a two-space indented JSON object, replacing any previous file.
pub fn write_metrics_json(path: &Path, metrics: &LeadTimeMetrics) -> Result<()> {
    let body = serde_json::to_string_pretty(metrics)?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), "Wrote metrics document");
    Ok(())
}

/// Writes the top lead-time table as CSV with a header row, replacing any previous file.
///
/// The header is written even when the table has no rows.
pub fn write_top_leads_csv(path: &Path, table: &TopLeadTable) -> Result<()> {
    let file = File::create(path).with_context(|| format!("writing {}", path.display()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);

    writer.write_record(TOP_LEAD_COLUMNS)?;
    for record in table.records() {
        writer.serialize(record)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = table.rows.len(), "Wrote top lead-time table");
    Ok(())
}

/// Formats the console summary block printed at the end of an evaluation.
pub fn summary_text(metrics: &LeadTimeMetrics) -> String {
    format!(
        "\nMetrics summary:\n  Total cells: {}\n  Cells with anomalies: {}\n  Mean lead cycles: {:.1}\n  Median lead cycles: {:.1}",
        metrics.cells,
        metrics.cells_with_anomalies,
        metrics.mean_lead_cycles,
        metrics.median_lead_cycles,
    )
}

pub fn print_summary(metrics: &LeadTimeMetrics) {
    println!("{}", summary_text(metrics));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leadtime::types::TopLeadRow;

    fn metrics() -> LeadTimeMetrics {
        LeadTimeMetrics {
            cells: 2,
            cells_with_anomalies: 1,
            mean_lead_cycles: 50.0,
            median_lead_cycles: 50.0,
        }
    }

    #[test]
    fn test_write_metrics_json_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(METRICS_FILE);

        write_metrics_json(&path, &metrics()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "{\n  \"cells\": 2,\n  \"cells_with_anomalies\": 1,\n  \"mean_lead_cycles\": 50.0,\n  \"median_lead_cycles\": 50.0\n}"
        );
    }

    #[test]
    fn test_write_metrics_json_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(METRICS_FILE);
        fs::write(&path, "stale content that is longer than the new document ....................................................................................").unwrap();

        write_metrics_json(&path, &metrics()).unwrap();

        let parsed: LeadTimeMetrics =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, metrics());
    }

    #[test]
    fn test_write_top_leads_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOP_LEADS_FILE);
        let table = TopLeadTable {
            rows: vec![
                TopLeadRow {
                    battery_id: "2".into(),
                    lead_cycles: Some(50.0),
                    first_anomaly_test_id: Some(70.0),
                    eol_test_id: Some(120.0),
                    total_cycles: Some(120.0),
                },
                TopLeadRow {
                    battery_id: "1".into(),
                    lead_cycles: Some(0.0),
                    first_anomaly_test_id: None,
                    eol_test_id: Some(100.0),
                    total_cycles: Some(100.0),
                },
            ],
        };

        write_top_leads_csv(&path, &table).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "battery_id,lead_cycles,first_anomaly_test_id,eol_test_id,total_cycles\n\
             2,50,70.0,120,120\n\
             1,0,,100,100\n"
        );
    }

    #[test]
    fn test_write_top_leads_csv_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOP_LEADS_FILE);

        write_top_leads_csv(&path, &TopLeadTable::default()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_summary_text_rounds_to_one_decimal() {
        let text = summary_text(&LeadTimeMetrics {
            cells: 12,
            cells_with_anomalies: 5,
            mean_lead_cycles: 33.3333,
            median_lead_cycles: 27.96,
        });

        assert!(text.starts_with("\nMetrics summary:"));
        assert!(text.contains("  Total cells: 12\n"));
        assert!(text.contains("  Cells with anomalies: 5\n"));
        assert!(text.contains("  Mean lead cycles: 33.3\n"));
        assert!(text.ends_with("  Median lead cycles: 28.0"));
    }
}
