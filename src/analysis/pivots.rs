//! Classical floor-trader pivot points

use serde::{Deserialize, Serialize};

use crate::core::{AnalyzerError, AnalyzerResult, PriceBar, PriceSeries};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoints {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl PivotPoints {
    /// Levels from one period's high, low and close
    pub fn from_hlc(high: f64, low: f64, close: f64) -> Self {
        Self::around((high + low + close) / 3.0, high, low)
    }

    pub fn from_bar(bar: &PriceBar) -> Self {
        Self::around(bar.typical(), bar.high, bar.low)
    }

    fn around(pivot: f64, high: f64, low: f64) -> Self {
        let range = high - low;
        Self {
            pivot,
            r1: 2.0 * pivot - low,
            s1: 2.0 * pivot - high,
            r2: pivot + range,
            s2: pivot - range,
            r3: pivot + 2.0 * range,
            s3: pivot - 2.0 * range,
        }
    }

    /// (level, resistance, support), nearest first
    pub fn levels(&self) -> [(u8, f64, f64); 3] {
        [(1, self.r1, self.s1), (2, self.r2, self.s2), (3, self.r3, self.s3)]
    }
}

/// Pivot points from the prior complete period (the second-to-last bar).
/// The last bar is the session still in progress.
pub fn pivot_points(series: &PriceSeries) -> AnalyzerResult<PivotPoints> {
    series
        .prior()
        .map(PivotPoints::from_bar)
        .ok_or_else(|| AnalyzerError::insufficient(2, series.len()))
}
