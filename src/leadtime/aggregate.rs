use crate::leadtime::types::{LeadTimeMetrics, TopLeadRow, TopLeadTable};
use crate::leadtime::utility::{mean, median};
use crate::summary::AnomalySummaryRow;

/// Number of rows kept in the top lead-time table.
pub const TOP_N: usize = 5;

/// Lead cycles of every cell whose first anomaly preceded end-of-life, in row order.
pub fn anomalous_lead_cycles(rows: &[AnomalySummaryRow]) -> Vec<f64> {
    rows.iter().filter_map(AnomalySummaryRow::anomalous_lead).collect()
}

/// Aggregates the summary rows into [`LeadTimeMetrics`].
///
/// Mean and median are taken over the cells with `lead_cycles > 0` only and
/// are 0.0 when no cell qualifies.
pub fn compute_metrics(rows: &[AnomalySummaryRow]) -> LeadTimeMetrics {
    let leads = anomalous_lead_cycles(rows);

    LeadTimeMetrics {
        cells: rows.len(),
        cells_with_anomalies: leads.len(),
        mean_lead_cycles: mean(&leads),
        median_lead_cycles: median(&leads),
    }
}

/// Selects the `n` rows with the largest `lead_cycles`, largest first.
///
/// Rows without a lead value are never selected. Equal leads keep their input
/// order.
pub fn top_lead_rows(rows: &[AnomalySummaryRow], n: usize) -> TopLeadTable {
    let mut ranked: Vec<(f64, &AnomalySummaryRow)> = rows
        .iter()
        .filter_map(|row| {
            row.lead_cycles
                .filter(|lead| !lead.is_nan())
                .map(|lead| (lead, row))
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|(a, _), (b, _)| b.total_cmp(a));

    TopLeadTable {
        rows: ranked
            .into_iter()
            .take(n)
            .map(|(_, row)| TopLeadRow {
                battery_id: row.battery_id.clone(),
                lead_cycles: row.lead_cycles,
                first_anomaly_test_id: row.first_anomaly_test_id,
                eol_test_id: row.eol_test_id,
                total_cycles: row.total_cycles,
            })
            .collect(),
    }
}
