//! CSV and JSON export
//!
//! One file pair per analysis kind and symbol under the export directory,
//! named `<kind>_<symbol>.json` / `<kind>_<symbol>.csv`. Files are
//! overwritten on every run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::analysis::{IndicatorSet, PivotPoints};
use crate::core::AnalyzerResult;

/// One named value, the flat form of an indicator set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub metric: String,
    pub value: f64,
}

impl MetricRow {
    fn new(metric: impl Into<String>, value: f64) -> Self {
        Self {
            metric: metric.into(),
            value,
        }
    }
}

/// Every non-pivot indicator in display order. Indicators that could not be
/// computed are left out.
pub fn indicator_metrics(set: &IndicatorSet) -> Vec<MetricRow> {
    let mut rows = Vec::new();
    rows.extend(set.sma.iter().map(|(w, v)| MetricRow::new(format!("SMA ({w})"), *v)));
    rows.extend(set.ema.iter().map(|(w, v)| MetricRow::new(format!("EMA ({w})"), *v)));
    rows.push(MetricRow::new("RSI", set.rsi));
    rows.push(MetricRow::new("MACD", set.macd.macd_line));
    rows.push(MetricRow::new("MACD Signal", set.macd.signal_line));
    rows.push(MetricRow::new("MACD Hist", set.macd.histogram));

    if let Some(b) = set.bollinger {
        rows.push(MetricRow::new("Bollinger Upper", b.upper));
        rows.push(MetricRow::new("Bollinger Middle", b.middle));
        rows.push(MetricRow::new("Bollinger Lower", b.lower));
    }
    if let Some(s) = set.stochastic {
        rows.push(MetricRow::new("Stochastic %K", s.k));
        rows.push(MetricRow::new("Stochastic %D", s.d));
    }
    if let Some(adx) = set.adx {
        rows.push(MetricRow::new("ADX (14)", adx));
    }
    rows
}

pub fn pivot_metrics(pivots: &PivotPoints) -> Vec<MetricRow> {
    vec![
        MetricRow::new("PP", pivots.pivot),
        MetricRow::new("R1", pivots.r1),
        MetricRow::new("R2", pivots.r2),
        MetricRow::new("R3", pivots.r3),
        MetricRow::new("S1", pivots.s1),
        MetricRow::new("S2", pivots.s2),
        MetricRow::new("S3", pivots.s3),
    ]
}

/// Writes analysis results under one directory
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target path for one export file
    pub fn path_for(&self, kind: &str, symbol: &str, extension: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", kind, file_safe(symbol), extension))
    }

    /// Pretty-printed JSON of any serializable value
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        kind: &str,
        symbol: &str,
        value: &T,
    ) -> AnalyzerResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(kind, symbol, "json");
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        tracing::debug!(path = %path.display(), "wrote JSON export");
        Ok(path)
    }

    /// CSV with a header row taken from the record fields
    pub fn write_csv<R: Serialize>(
        &self,
        kind: &str,
        symbol: &str,
        rows: &[R],
    ) -> AnalyzerResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(kind, symbol, "csv");
        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        tracing::debug!(path = %path.display(), rows = rows.len(), "wrote CSV export");
        Ok(path)
    }

    /// Both formats: the full value as JSON and the flat rows as CSV
    pub fn export<T, R>(
        &self,
        kind: &str,
        symbol: &str,
        value: &T,
        rows: &[R],
    ) -> AnalyzerResult<Vec<PathBuf>>
    where
        T: Serialize + ?Sized,
        R: Serialize,
    {
        Ok(vec![
            self.write_json(kind, symbol, value)?,
            self.write_csv(kind, symbol, rows)?,
        ])
    }
}

/// Read back a JSON export
pub fn load_json<T: DeserializeOwned>(path: &Path) -> AnalyzerResult<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// `$SPX.X` -> `SPX_X`, `^GSPC` -> `GSPC`
fn file_safe(symbol: &str) -> String {
    let mapped: String = symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = mapped.trim_matches('_');
    if trimmed.is_empty() {
        "all".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::indicators::{MacdValue, Stochastic};
    use crate::analysis::{IronflyResult, SentimentRecord};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn indicator_set() -> IndicatorSet {
        IndicatorSet {
            sma: BTreeMap::from([(50, 101.25), (200, 98.5)]),
            ema: BTreeMap::from([(50, 101.0)]),
            rsi: 61.3,
            macd: MacdValue {
                macd_line: 1.2,
                signal_line: 0.9,
                histogram: 0.3,
            },
            pivot_points: PivotPoints::from_hlc(110.0, 90.0, 100.0),
            bollinger: None,
            stochastic: Some(Stochastic { k: 72.0, d: 65.0 }),
            adx: None,
        }
    }

    #[test]
    fn test_file_names() {
        let exporter = Exporter::new("/tmp/out");
        assert_eq!(
            exporter.path_for("ironfly", "$SPX.X", "csv"),
            PathBuf::from("/tmp/out/ironfly_SPX_X.csv")
        );
        assert_eq!(file_safe("^GSPC"), "GSPC");
        assert_eq!(file_safe("$$"), "all");
    }

    #[test]
    fn test_indicator_metrics_skip_missing() {
        let rows = indicator_metrics(&indicator_set());
        let names: Vec<&str> = rows.iter().map(|r| r.metric.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "SMA (50)",
                "SMA (200)",
                "EMA (50)",
                "RSI",
                "MACD",
                "MACD Signal",
                "MACD Hist",
                "Stochastic %K",
                "Stochastic %D",
            ]
        );
        assert_eq!(pivot_metrics(&indicator_set().pivot_points)[1].value, 110.0);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path().join("nested"));
        let set = indicator_set();

        let path = exporter.write_json("indicators", "^GSPC", &set).unwrap();
        let loaded: IndicatorSet = load_json(&path).unwrap();

        assert!((loaded.rsi - set.rsi).abs() < 1e-9);
        assert!((loaded.sma[&200] - 98.5).abs() < 1e-9);
        assert_eq!(loaded.stochastic, set.stochastic);
    }

    #[test]
    fn test_csv_rows_and_overwrite() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let record = |symbol: &str, count| SentimentRecord {
            symbol: symbol.into(),
            mention_count: count,
            aggregate_sentiment_score: 0.25,
            neg: 0.1,
            neu: 0.6,
            pos: 0.3,
            last_price: None,
        };

        exporter
            .write_csv("reddit", "wallstreetbets", &[record("GME", 9), record("AMC", 7)])
            .unwrap();
        let path = exporter
            .write_csv("reddit", "wallstreetbets", &[record("NVDA", 6)])
            .unwrap();

        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("symbol,mention_count,aggregate_sentiment_score"));
        assert!(lines[1].starts_with("NVDA,6,0.25"));
    }

    #[test]
    fn test_export_writes_both_formats() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let result = IronflyResult {
            symbol: "SPY".into(),
            expiry: NaiveDate::from_ymd_opt(2025, 3, 21).unwrap(),
            atm_strike: 570.0,
            lower_wing_strike: 560.0,
            upper_wing_strike: 580.0,
            atm_call_bid: 4.1,
            atm_put_bid: 3.9,
            upper_call_ask: 0.8,
            lower_put_ask: 1.1,
            net_price: 6.1,
            used_fallback: true,
        };

        let paths = exporter
            .export("ironfly", "$SPX.X", &result, std::slice::from_ref(&result))
            .unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.exists()));

        let loaded: IronflyResult = load_json(&paths[0]).unwrap();
        assert_eq!(loaded, result);
        let csv_text = fs::read_to_string(&paths[1]).unwrap();
        assert!(csv_text.contains("2025-03-21"));
    }
}
