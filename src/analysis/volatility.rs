//! Volatility index snapshots and the VIX term-structure ratio

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{AnalyzerError, AnalyzerResult, PriceSeries};
use crate::data::{resolve_symbol, MarketData};

/// Indices in the market indicator table: (ticker, display name)
pub const VOLATILITY_INDICES: &[(&str, &str)] = &[
    ("$VIX.X", "VIX"),
    ("$VIX3M.X", "VIX3M"),
    ("$VVIX.X", "VVIX"),
    ("$SKEW.X", "SKEW"),
    ("$VXN.X", "NASDAQ VIX"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySnapshot {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub low_52w: Option<f64>,
    pub high_52w: Option<f64>,
}

impl VolatilitySnapshot {
    /// Where the price sits in its 52-week range, 0 at the low and 1 at the high
    pub fn range_position(&self) -> Option<f64> {
        let (low, high) = (self.low_52w?, self.high_52w?);
        if high > low {
            Some(((self.price - low) / (high - low)).clamp(0.0, 1.0))
        } else {
            None
        }
    }
}

/// VIX and VIX3M closes for one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioPoint {
    pub date: NaiveDate,
    pub vix: f64,
    pub vix3m: f64,
    /// VIX3M / VIX; above 1 is contango
    pub ratio: f64,
}

/// Quote every index in [`VOLATILITY_INDICES`]. An index that fails is
/// logged and left out; the call fails only when none could be quoted.
pub fn volatility_snapshots<P: MarketData + ?Sized>(provider: &P) -> AnalyzerResult<Vec<VolatilitySnapshot>> {
    let mut snapshots = Vec::with_capacity(VOLATILITY_INDICES.len());

    for (ticker, name) in VOLATILITY_INDICES {
        let symbol = resolve_symbol(ticker);
        match provider.quote(symbol) {
            Ok(quote) => snapshots.push(VolatilitySnapshot {
                name: name.to_string(),
                symbol: symbol.to_string(),
                price: quote.price,
                low_52w: quote.fifty_two_week_low,
                high_52w: quote.fifty_two_week_high,
            }),
            Err(e) => tracing::warn!("Skipping {} ({}): {}", name, symbol, e),
        }
    }

    if snapshots.is_empty() {
        return Err(AnalyzerError::no_data("No volatility index could be quoted"));
    }
    Ok(snapshots)
}

/// Align two daily series by date and take VIX3M / VIX.
/// Dates present in only one series, or with a non-positive VIX, are dropped.
pub fn vix_ratio(vix: &PriceSeries, vix3m: &PriceSeries) -> AnalyzerResult<Vec<RatioPoint>> {
    let long: BTreeMap<NaiveDate, f64> = vix3m.bars.iter().map(|b| (b.date(), b.close)).collect();

    let points: Vec<RatioPoint> = vix
        .bars
        .iter()
        .map(|b| (b.date(), b.close))
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .filter(|(_, v)| *v > 0.0)
        .filter_map(|(date, vix)| {
            let vix3m = *long.get(&date)?;
            Some(RatioPoint {
                date,
                vix,
                vix3m,
                ratio: vix3m / vix,
            })
        })
        .collect();

    if points.is_empty() {
        return Err(AnalyzerError::no_data("VIX and VIX3M histories share no dates"));
    }
    Ok(points)
}

/// Fetch both histories over `period` and compute the ratio
pub fn vix_ratio_history<P: MarketData + ?Sized>(provider: &P, period: &str) -> AnalyzerResult<Vec<RatioPoint>> {
    let vix = provider.history(resolve_symbol("$VIX.X"), period)?;
    let vix3m = provider.history(resolve_symbol("$VIX3M.X"), period)?;
    let points = vix_ratio(&vix, &vix3m)?;
    tracing::debug!(points = points.len(), period, "computed VIX ratio");
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OptionChain, PriceBar, SpotQuote};
    use chrono::{TimeZone, Utc};

    fn series(symbol: &str, closes: &[(u32, f64)]) -> PriceSeries {
        let bars = closes
            .iter()
            .map(|&(day, close)| PriceBar {
                timestamp: Utc.with_ymd_and_hms(2025, 4, day, 20, 0, 0).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0.0,
            })
            .collect();
        PriceSeries::new(symbol, bars)
    }

    #[test]
    fn test_vix_ratio_aligns_dates() {
        let vix = series("^VIX", &[(1, 20.0), (2, 25.0), (3, 0.0), (4, 16.0)]);
        let vix3m = series("^VIX3M", &[(2, 22.5), (3, 21.0), (4, 20.0), (7, 19.0)]);

        let points = vix_ratio(&vix, &vix3m).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 4, 2).unwrap());
        assert!((points[0].ratio - 0.9).abs() < 1e-12);
        assert!((points[1].ratio - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_vix_ratio_no_overlap() {
        let vix = series("^VIX", &[(1, 20.0)]);
        let vix3m = series("^VIX3M", &[(2, 22.0)]);
        assert!(matches!(vix_ratio(&vix, &vix3m), Err(AnalyzerError::NoData(_))));
    }

    struct PartialProvider;

    impl MarketData for PartialProvider {
        fn quote(&self, symbol: &str) -> AnalyzerResult<SpotQuote> {
            if symbol == "^SKEW" {
                return Err(AnalyzerError::upstream("unavailable"));
            }
            let mut quote = SpotQuote::new(symbol, 18.0);
            quote.fifty_two_week_low = Some(12.0);
            quote.fifty_two_week_high = Some(42.0);
            Ok(quote)
        }

        fn history(&self, symbol: &str, _period: &str) -> AnalyzerResult<PriceSeries> {
            Err(AnalyzerError::no_data(format!("no history for {symbol}")))
        }

        fn expirations(&self, _symbol: &str) -> AnalyzerResult<Vec<NaiveDate>> {
            Ok(Vec::new())
        }

        fn option_chain(&self, symbol: &str, expiry: NaiveDate) -> AnalyzerResult<OptionChain> {
            Ok(OptionChain::new(symbol, 0.0, expiry))
        }
    }

    #[test]
    fn test_snapshots_skip_failures() {
        let snapshots = volatility_snapshots(&PartialProvider).unwrap();

        assert_eq!(snapshots.len(), 4);
        assert!(snapshots.iter().all(|s| s.symbol != "^SKEW"));
        assert_eq!(snapshots[3].name, "NASDAQ VIX");
        assert!((snapshots[0].range_position().unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_history_propagates_errors() {
        assert!(matches!(
            vix_ratio_history(&PartialProvider, "1y"),
            Err(AnalyzerError::NoData(_))
        ));
    }
}
