//! Report output
//!
//! - Terminal tables for each analysis section
//! - ASCII line charts for the VIX ratio and technical analysis plots
//! - CSV / JSON export of analysis results

pub mod tables;
pub mod chart;
pub mod export;

pub use tables::*;
pub use chart::{ta_chart, vix_ratio_chart, LineChart, TA_MIN_BARS};
pub use export::{indicator_metrics, load_json, pivot_metrics, Exporter, MetricRow};
