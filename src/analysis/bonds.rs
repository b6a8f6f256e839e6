//! Treasury average interest rate summary

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::core::YieldPoint;

/// Distinct record dates shown in the bond table
pub const BOND_DATES_SHOWN: usize = 5;

/// Earliest record date requested from FiscalData
pub fn bond_history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// One record per distinct date, in input order, for the first `dates`
/// distinct dates
pub fn recent_by_date(points: &[YieldPoint], dates: usize) -> Vec<YieldPoint> {
    let mut seen = HashSet::new();
    points
        .iter()
        .filter(|p| seen.insert(p.record_date))
        .take(dates)
        .cloned()
        .collect()
}
