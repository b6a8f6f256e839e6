//! Technical indicators over daily closes
//!
//! Scalar functions return the value at the last bar. The `*_series`
//! variants return one slot per input bar, `None` until the indicator has
//! warmed up, so they line up with the bar dates for charting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::pivots::{pivot_points, PivotPoints};
use crate::core::{AnalyzerError, AnalyzerResult, PriceSeries};

pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_STD_DEVS: f64 = 2.0;
pub const STOCH_K: usize = 5;
pub const STOCH_SMOOTH: usize = 3;
pub const STOCH_D: usize = 3;
pub const ADX_WINDOW: usize = 14;

/// MACD periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl MacdParams {
    /// Closes needed before the first signal value exists
    pub fn required(&self) -> usize {
        self.slow + self.signal - 1
    }
}

/// Which indicator windows to compute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorWindows {
    pub sma_windows: Vec<usize>,
    pub ema_windows: Vec<usize>,
    pub rsi_window: usize,
    pub macd: MacdParams,
}

impl Default for IndicatorWindows {
    fn default() -> Self {
        Self {
            sma_windows: vec![50, 200],
            ema_windows: vec![50, 200],
            rsi_window: 14,
            macd: MacdParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Slow stochastic oscillator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

/// Indicator values at the last bar of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub sma: BTreeMap<usize, f64>,
    pub ema: BTreeMap<usize, f64>,
    pub rsi: f64,
    pub macd: MacdValue,
    pub pivot_points: PivotPoints,
    pub bollinger: Option<BollingerBands>,
    pub stochastic: Option<Stochastic>,
    pub adx: Option<f64>,
}

/// Compute every configured indicator at the last bar.
///
/// Core indicators (SMA, EMA, RSI, MACD, pivots) fail the whole set when
/// the series is too short; Bollinger, stochastic and ADX are left `None`.
pub fn compute_indicators(
    series: &PriceSeries,
    windows: &IndicatorWindows,
) -> AnalyzerResult<IndicatorSet> {
    let closes = series.closes();

    let mut sma_values = BTreeMap::new();
    for &w in &windows.sma_windows {
        sma_values.insert(w, sma(&closes, w)?);
    }

    let mut ema_values = BTreeMap::new();
    for &w in &windows.ema_windows {
        ema_values.insert(w, ema(&closes, w)?);
    }

    let highs = series.highs();
    let lows = series.lows();

    let set = IndicatorSet {
        sma: sma_values,
        ema: ema_values,
        rsi: rsi(&closes, windows.rsi_window)?,
        macd: macd(&closes, &windows.macd)?,
        pivot_points: pivot_points(series)?,
        bollinger: bollinger(&closes, BOLLINGER_WINDOW, BOLLINGER_STD_DEVS),
        stochastic: stochastic(&highs, &lows, &closes, STOCH_K, STOCH_SMOOTH, STOCH_D),
        adx: adx(&highs, &lows, &closes, ADX_WINDOW),
    };

    tracing::debug!(
        symbol = %series.symbol,
        bars = series.len(),
        rsi = set.rsi,
        "computed indicators"
    );
    Ok(set)
}

fn check_window(window: usize, available: usize, required: usize) -> AnalyzerResult<()> {
    if window == 0 {
        return Err(AnalyzerError::invalid_input("indicator window must be > 0"));
    }
    if available < required {
        return Err(AnalyzerError::insufficient(required, available));
    }
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn last_value<T: Copy>(series: &[Option<T>]) -> AnalyzerResult<T> {
    series
        .last()
        .copied()
        .flatten()
        .ok_or_else(|| AnalyzerError::insufficient(series.len() + 1, series.len()))
}

/// Simple moving average of the last `window` values
pub fn sma(values: &[f64], window: usize) -> AnalyzerResult<f64> {
    check_window(window, values.len(), window)?;
    Ok(mean(&values[values.len() - window..]))
}

pub fn sma_series(values: &[f64], window: usize) -> AnalyzerResult<Vec<Option<f64>>> {
    check_window(window, values.len(), window)?;

    let mut out = vec![None; values.len()];
    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = Some(sum / window as f64);
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out[i] = Some(sum / window as f64);
    }
    Ok(out)
}

/// Exponential moving average, alpha = 2/(w+1), seeded with the SMA of
/// the first `window` values
pub fn ema(values: &[f64], window: usize) -> AnalyzerResult<f64> {
    last_value(&ema_series(values, window)?)
}

pub fn ema_series(values: &[f64], window: usize) -> AnalyzerResult<Vec<Option<f64>>> {
    check_window(window, values.len(), window)?;

    let alpha = 2.0 / (window as f64 + 1.0);
    let mut out = vec![None; values.len()];
    let mut current = mean(&values[..window]);
    out[window - 1] = Some(current);
    for i in window..values.len() {
        current = alpha * values[i] + (1.0 - alpha) * current;
        out[i] = Some(current);
    }
    Ok(out)
}

/// Relative strength index with Wilder smoothing
pub fn rsi(values: &[f64], window: usize) -> AnalyzerResult<f64> {
    last_value(&rsi_series(values, window)?)
}

pub fn rsi_series(values: &[f64], window: usize) -> AnalyzerResult<Vec<Option<f64>>> {
    check_window(window, values.len(), window + 1)?;

    let w = window as f64;
    let mut out = vec![None; values.len()];

    let (mut avg_gain, mut avg_loss) = (0.0, 0.0);
    for i in 1..=window {
        let change = values[i] - values[i - 1];
        avg_gain += change.max(0.0);
        avg_loss += (-change).max(0.0);
    }
    avg_gain /= w;
    avg_loss /= w;
    out[window] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in window + 1..values.len() {
        let change = values[i] - values[i - 1];
        avg_gain = (avg_gain * (w - 1.0) + change.max(0.0)) / w;
        avg_loss = (avg_loss * (w - 1.0) + (-change).max(0.0)) / w;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    Ok(out)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// MACD line, signal and histogram at the last bar
pub fn macd(values: &[f64], params: &MacdParams) -> AnalyzerResult<MacdValue> {
    last_value(&macd_series(values, params)?)
}

pub fn macd_series(values: &[f64], params: &MacdParams) -> AnalyzerResult<Vec<Option<MacdValue>>> {
    if params.fast == 0 || params.signal == 0 || params.fast >= params.slow {
        return Err(AnalyzerError::invalid_input(format!(
            "invalid MACD periods {}/{}/{}",
            params.fast, params.slow, params.signal
        )));
    }
    check_window(params.slow, values.len(), params.required())?;

    let fast = ema_series(values, params.fast)?;
    let slow = ema_series(values, params.slow)?;

    let start = params.slow - 1;
    let line: Vec<f64> = (start..values.len())
        .filter_map(|i| Some(fast[i]? - slow[i]?))
        .collect();
    let signal = ema_series(&line, params.signal)?;

    let mut out = vec![None; values.len()];
    for (j, sig) in signal.iter().enumerate() {
        if let Some(signal_line) = *sig {
            out[start + j] = Some(MacdValue {
                macd_line: line[j],
                signal_line,
                histogram: line[j] - signal_line,
            });
        }
    }
    Ok(out)
}

fn bands(window: &[f64], std_devs: f64) -> BollingerBands {
    let middle = mean(window);
    let variance = window.iter().map(|v| (v - middle).powi(2)).sum::<f64>() / window.len() as f64;
    let offset = std_devs * variance.sqrt();
    BollingerBands {
        upper: middle + offset,
        middle,
        lower: middle - offset,
    }
}

/// Bollinger bands (population standard deviation) at the last bar
pub fn bollinger(values: &[f64], window: usize, std_devs: f64) -> Option<BollingerBands> {
    if window == 0 || values.len() < window {
        return None;
    }
    Some(bands(&values[values.len() - window..], std_devs))
}

pub fn bollinger_series(values: &[f64], window: usize, std_devs: f64) -> Vec<Option<BollingerBands>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                None
            } else {
                Some(bands(&values[i + 1 - window..=i], std_devs))
            }
        })
        .collect()
}

/// Slow stochastic: fast %K over `k_period`, smoothed by `smooth` into
/// slow %K, with %D the `d_period` average of slow %K. A flat range reads
/// as 50.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    smooth: usize,
    d_period: usize,
) -> Option<Stochastic> {
    let n = closes.len();
    if k_period == 0 || smooth == 0 || d_period == 0 {
        return None;
    }
    if highs.len() != n || lows.len() != n || n < k_period + smooth + d_period - 2 {
        return None;
    }

    let fast_k: Vec<f64> = (k_period - 1..n)
        .map(|i| {
            let lo = lows[i + 1 - k_period..=i].iter().copied().fold(f64::INFINITY, f64::min);
            let hi = highs[i + 1 - k_period..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if hi - lo > 0.0 {
                100.0 * (closes[i] - lo) / (hi - lo)
            } else {
                50.0
            }
        })
        .collect();

    let slow_k: Vec<f64> = fast_k.windows(smooth).map(mean).collect();
    let d = mean(&slow_k[slow_k.len() - d_period..]);
    let k = *slow_k.last()?;

    Some(Stochastic { k, d })
}

/// Average directional index with Wilder smoothing; needs `2 * window` bars
pub fn adx(highs: &[f64], lows: &[f64], closes: &[f64], window: usize) -> Option<f64> {
    let n = closes.len();
    if window == 0 || highs.len() != n || lows.len() != n || n < 2 * window {
        return None;
    }

    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);
    let mut true_range = Vec::with_capacity(n - 1);
    for i in 1..n {
        let up = highs[i] - highs[i - 1];
        let down = lows[i - 1] - lows[i];
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
        true_range.push(
            (highs[i] - lows[i])
                .max((highs[i] - closes[i - 1]).abs())
                .max((lows[i] - closes[i - 1]).abs()),
        );
    }

    let dx = |pdm: f64, mdm: f64, tr: f64| {
        if tr <= 0.0 {
            return 0.0;
        }
        let plus_di = 100.0 * pdm / tr;
        let minus_di = 100.0 * mdm / tr;
        let sum = plus_di + minus_di;
        if sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / sum
        }
    };

    let w = window as f64;
    let mut s_plus: f64 = plus_dm[..window].iter().sum();
    let mut s_minus: f64 = minus_dm[..window].iter().sum();
    let mut s_tr: f64 = true_range[..window].iter().sum();

    let mut dxs = vec![dx(s_plus, s_minus, s_tr)];
    for j in window..plus_dm.len() {
        s_plus = s_plus - s_plus / w + plus_dm[j];
        s_minus = s_minus - s_minus / w + minus_dm[j];
        s_tr = s_tr - s_tr / w + true_range[j];
        dxs.push(dx(s_plus, s_minus, s_tr));
    }

    let mut value = mean(&dxs[..window]);
    for &d in &dxs[window..] {
        value = (value * (w - 1.0) + d) / w;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PriceBar;
    use chrono::{Duration, TimeZone, Utc};

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                timestamp: start + Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1_000.0,
            })
            .collect();
        PriceSeries::new("TEST", bars)
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 10.0 * (i as f64 / 7.0).sin() + i as f64 * 0.05)
            .collect()
    }

    #[test]
    fn test_sma_trailing_mean() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((sma(&values, 3).unwrap() - 4.0).abs() < 1e-12);
        assert!((sma(&values, 5).unwrap() - 3.0).abs() < 1e-12);

        let series = sma_series(&values, 2).unwrap();
        assert_eq!(series[0], None);
        assert_eq!(series[1], Some(1.5));
        assert_eq!(series[4], Some(4.5));
    }

    #[test]
    fn test_sma_insufficient() {
        let err = sma(&[1.0, 2.0], 3).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::InsufficientData { required: 3, available: 2 }
        ));
        assert!(matches!(sma(&[1.0], 0), Err(AnalyzerError::InvalidInput(_))));
    }

    #[test]
    fn test_ema_seed_and_recursion() {
        let values = [2.0, 4.0, 6.0, 8.0];
        let series = ema_series(&values, 3).unwrap();
        // Seed is SMA(2, 4, 6) = 4, then alpha = 0.5
        assert_eq!(series[2], Some(4.0));
        assert_eq!(series[3], Some(6.0));
    }

    #[test]
    fn test_ema_deterministic() {
        let values = wave(120);
        let a = ema(&values, 20).unwrap();
        let b = ema(&values, 20).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_rsi_bounds() {
        let rising: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&rising, 14).unwrap(), 100.0);

        let falling: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        assert!(rsi(&falling, 14).unwrap().abs() < 1e-12);

        for value in rsi_series(&wave(200), 14).unwrap().into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_needs_window_plus_one() {
        let values: Vec<f64> = (0..14).map(|i| i as f64).collect();
        assert!(matches!(
            rsi(&values, 14),
            Err(AnalyzerError::InsufficientData { required: 15, available: 14 })
        ));
    }

    #[test]
    fn test_macd_histogram() {
        let values = wave(100);
        let params = MacdParams::default();
        let value = macd(&values, &params).unwrap();

        assert!((value.histogram - (value.macd_line - value.signal_line)).abs() < 1e-12);

        let series = macd_series(&values, &params).unwrap();
        assert!(series[params.required() - 2].is_none());
        assert!(series[params.required() - 1].is_some());
    }

    #[test]
    fn test_macd_constant_series_is_flat() {
        let values = vec![50.0; 60];
        let value = macd(&values, &MacdParams::default()).unwrap();
        assert!(value.macd_line.abs() < 1e-12);
        assert!(value.histogram.abs() < 1e-12);
    }

    #[test]
    fn test_bollinger_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bands = bollinger(&values, 8, 2.0).unwrap();
        // mean 5, population std 2
        assert!((bands.middle - 5.0).abs() < 1e-12);
        assert!((bands.upper - 9.0).abs() < 1e-12);
        assert!((bands.lower - 1.0).abs() < 1e-12);

        assert!(bollinger(&values, 9, 2.0).is_none());
    }

    #[test]
    fn test_stochastic_range() {
        let closes = wave(40);
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();

        let stoch = stochastic(&highs, &lows, &closes, 5, 3, 3).unwrap();
        assert!((0.0..=100.0).contains(&stoch.k));
        assert!((0.0..=100.0).contains(&stoch.d));

        assert!(stochastic(&highs[..6], &lows[..6], &closes[..6], 5, 3, 3).is_none());
    }

    #[test]
    fn test_adx_trend() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 2.0 * i as f64).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();

        // A steady uptrend is all +DM
        let value = adx(&highs, &lows, &closes, 14).unwrap();
        assert!((value - 100.0).abs() < 1e-9);

        assert!(adx(&highs[..27], &lows[..27], &closes[..27], 14).is_none());
    }

    #[test]
    fn test_compute_indicators() {
        let series = series_from_closes(&wave(250));
        let set = compute_indicators(&series, &IndicatorWindows::default()).unwrap();

        assert_eq!(set.sma.keys().copied().collect::<Vec<_>>(), vec![50, 200]);
        assert!((set.sma[&50] - sma(&series.closes(), 50).unwrap()).abs() < 1e-12);
        assert!(set.bollinger.is_some());
        assert!(set.stochastic.is_some());
        assert!(set.adx.is_some());
    }

    #[test]
    fn test_compute_indicators_short_series() {
        let series = series_from_closes(&wave(120));
        let err = compute_indicators(&series, &IndicatorWindows::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::InsufficientData { required: 200, available: 120 }
        ));
    }

    #[test]
    fn test_indicator_set_json_round_trip() {
        let series = series_from_closes(&wave(250));
        let set = compute_indicators(&series, &IndicatorWindows::default()).unwrap();

        let json = serde_json::to_string(&set).unwrap();
        let back: IndicatorSet = serde_json::from_str(&json).unwrap();

        for (w, v) in &set.sma {
            assert!((back.sma[w] - v).abs() < 1e-9);
        }
        for (w, v) in &set.ema {
            assert!((back.ema[w] - v).abs() < 1e-9);
        }
        assert!((back.rsi - set.rsi).abs() < 1e-9);
        assert!((back.macd.histogram - set.macd.histogram).abs() < 1e-9);
        assert!((back.pivot_points.r3 - set.pivot_points.r3).abs() < 1e-9);
        assert!((back.adx.unwrap() - set.adx.unwrap()).abs() < 1e-9);
    }
}
