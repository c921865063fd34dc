//! Lead-time evaluation of the per-cell anomaly summary.
//!
//! This module turns the summary table into the aggregate metrics document,
//! the top-5 lead-time table and the lead-time histogram, and drives the
//! `eval-leadtime` command end to end.

pub mod aggregate;
pub mod evaluator;
pub mod histogram;
pub mod types;
pub mod utility;
