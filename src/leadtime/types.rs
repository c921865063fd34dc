//! Data types produced by the lead-time evaluation.

use serde::{Deserialize, Serialize};

/// Columns of `lead_time_top5.csv`, in output order.
pub const TOP_LEAD_COLUMNS: [&str; 5] = [
    "battery_id",
    "lead_cycles",
    "first_anomaly_test_id",
    "eol_test_id",
    "total_cycles",
];

/// Aggregate lead-time statistics, written as `lead_time_metrics.json`.
///
/// Field order is the key order of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTimeMetrics {
    pub cells: usize,
    pub cells_with_anomalies: usize,
    pub mean_lead_cycles: f64,
    pub median_lead_cycles: f64,
}

/// How a numeric column of the top-5 table is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFormat {
    /// Truncated to an integer, e.g. `42`.
    WholeNumber,
    /// Floating representation, e.g. `42.0`; missing values are empty.
    Float,
}

impl ColumnFormat {
    /// Picks [`ColumnFormat::WholeNumber`] only when every value is present.
    pub fn for_column<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        if values.into_iter().all(|v| v.is_some_and(f64::is_finite)) {
            ColumnFormat::WholeNumber
        } else {
            ColumnFormat::Float
        }
    }

    pub fn render(self, value: Option<f64>) -> String {
        match (self, value) {
            (_, None) => String::new(),
            (ColumnFormat::WholeNumber, Some(v)) => (v.trunc() as i64).to_string(),
            (ColumnFormat::Float, Some(v)) => format_float(v),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// One selected row of the top-5 table, projected onto [`TOP_LEAD_COLUMNS`].
#[derive(Debug, Clone, PartialEq)]
pub struct TopLeadRow {
    pub battery_id: String,
    pub lead_cycles: Option<f64>,
    pub first_anomaly_test_id: Option<f64>,
    pub eol_test_id: Option<f64>,
    pub total_cycles: Option<f64>,
}

/// A row of `lead_time_top5.csv` after per-column formatting.
#[derive(Debug, PartialEq, Serialize)]
pub struct TopLeadRecord {
    pub battery_id: String,
    pub lead_cycles: String,
    pub first_anomaly_test_id: String,
    pub eol_test_id: String,
    pub total_cycles: String,
}

/// The rows with the largest lead cycles, largest first.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TopLeadTable {
    pub rows: Vec<TopLeadRow>,
}

impl TopLeadTable {
    fn format_of(&self, column: impl Fn(&TopLeadRow) -> Option<f64>) -> ColumnFormat {
        ColumnFormat::for_column(self.rows.iter().map(column))
    }

    /// Formats every row, deciding whole-number rendering per column.
    ///
    /// `battery_id` is written verbatim unless every selected identifier is
    /// numeric, in which case it is written as a whole number too.
    pub fn records(&self) -> Vec<TopLeadRecord> {
        let ids: Vec<Option<f64>> = self
            .rows
            .iter()
            .map(|r| r.battery_id.trim().parse::<f64>().ok())
            .collect();
        let id_format = ColumnFormat::for_column(ids.iter().copied());

        let lead = self.format_of(|r| r.lead_cycles);
        let first_anomaly = self.format_of(|r| r.first_anomaly_test_id);
        let eol = self.format_of(|r| r.eol_test_id);
        let total = self.format_of(|r| r.total_cycles);

        self.rows
            .iter()
            .zip(ids)
            .map(|(row, id)| TopLeadRecord {
                battery_id: match id_format {
                    ColumnFormat::WholeNumber => id_format.render(id),
                    ColumnFormat::Float => row.battery_id.clone(),
                },
                lead_cycles: lead.render(row.lead_cycles),
                first_anomaly_test_id: first_anomaly.render(row.first_anomaly_test_id),
                eol_test_id: eol.render(row.eol_test_id),
                total_cycles: total.render(row.total_cycles),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, lead: Option<f64>, first: Option<f64>) -> TopLeadRow {
        TopLeadRow {
            battery_id: id.to_string(),
            lead_cycles: lead,
            first_anomaly_test_id: first,
            eol_test_id: Some(120.0),
            total_cycles: Some(168.0),
        }
    }

    #[test]
    fn test_column_format_requires_every_value() {
        assert_eq!(
            ColumnFormat::for_column([Some(1.0), Some(2.0)]),
            ColumnFormat::WholeNumber
        );
        assert_eq!(
            ColumnFormat::for_column([Some(1.0), None]),
            ColumnFormat::Float
        );
        assert_eq!(
            ColumnFormat::for_column(std::iter::empty::<Option<f64>>()),
            ColumnFormat::WholeNumber
        );
    }

    #[test]
    fn test_render_values() {
        assert_eq!(ColumnFormat::WholeNumber.render(Some(42.0)), "42");
        assert_eq!(ColumnFormat::WholeNumber.render(Some(6.9)), "6");
        assert_eq!(ColumnFormat::Float.render(Some(42.0)), "42.0");
        assert_eq!(ColumnFormat::Float.render(Some(1.25)), "1.25");
        assert_eq!(ColumnFormat::Float.render(None), "");
    }

    #[test]
    fn test_missing_value_keeps_column_floating() {
        let table = TopLeadTable {
            rows: vec![row("B1", Some(50.0), None), row("B2", Some(30.0), Some(90.0))],
        };
        let records = table.records();

        assert_eq!(records[0].lead_cycles, "50");
        assert_eq!(records[0].first_anomaly_test_id, "");
        assert_eq!(records[1].first_anomaly_test_id, "90.0");
        assert_eq!(records[1].eol_test_id, "120");
        assert_eq!(records[0].battery_id, "B1");
    }

    #[test]
    fn test_numeric_battery_ids_become_whole_numbers() {
        let table = TopLeadTable {
            rows: vec![row("2.0", Some(50.0), Some(70.0)), row("1", Some(0.0), Some(10.0))],
        };
        let records = table.records();

        assert_eq!(records[0].battery_id, "2");
        assert_eq!(records[1].battery_id, "1");
    }

    #[test]
    fn test_metrics_serialize_in_document_order() {
        let metrics = LeadTimeMetrics {
            cells: 2,
            cells_with_anomalies: 1,
            mean_lead_cycles: 50.0,
            median_lead_cycles: 50.0,
        };
        let json = serde_json::to_string(&metrics).unwrap();
        assert_eq!(
            json,
            r#"{"cells":2,"cells_with_anomalies":1,"mean_lead_cycles":50.0,"median_lead_cycles":50.0}"#
        );
    }
}
