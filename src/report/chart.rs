//! ASCII line charts
//!
//! Each series is sampled onto a fixed character grid with a value axis on
//! the left, optional horizontal guide lines and a start/end date footer.

use chrono::NaiveDate;
use colored::Colorize;

use crate::analysis::indicators::{
    bollinger_series, ema_series, macd_series, rsi_series, sma_series, MacdParams,
    BOLLINGER_STD_DEVS, BOLLINGER_WINDOW,
};
use crate::analysis::RatioPoint;
use crate::core::{AnalyzerError, AnalyzerResult, PriceSeries};

/// Bars the TA chart needs, enough for the 200-day averages to warm up
pub const TA_MIN_BARS: usize = 200;

pub const DEFAULT_HEIGHT: usize = 15;
pub const DEFAULT_WIDTH: usize = 72;

const LABEL_WIDTH: usize = 10;
const GUIDE: char = '-';

#[derive(Debug, Clone)]
struct Series {
    label: String,
    glyph: char,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct LineChart {
    title: String,
    height: usize,
    width: usize,
    series: Vec<Series>,
    guides: Vec<f64>,
    dates: Option<(NaiveDate, NaiveDate)>,
}

impl LineChart {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            height: DEFAULT_HEIGHT,
            width: DEFAULT_WIDTH,
            series: Vec::new(),
            guides: Vec::new(),
            dates: None,
        }
    }

    pub fn size(mut self, height: usize, width: usize) -> Self {
        self.height = height.max(2);
        self.width = width.max(1);
        self
    }

    /// Add a series drawn with `glyph`. Later series draw over earlier ones.
    pub fn series(mut self, label: impl Into<String>, glyph: char, values: Vec<Option<f64>>) -> Self {
        self.series.push(Series {
            label: label.into(),
            glyph,
            values,
        });
        self
    }

    /// Horizontal reference line, always kept inside the value range
    pub fn guide(mut self, value: f64) -> Self {
        self.guides.push(value);
        self
    }

    pub fn dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.dates = Some((start, end));
        self
    }

    fn value_range(&self) -> Option<(f64, f64)> {
        let mut finite = self
            .series
            .iter()
            .flat_map(|s| s.values.iter().flatten())
            .copied()
            .filter(|v| v.is_finite())
            .peekable();
        finite.peek()?;

        let (lo, hi) = finite
            .chain(self.guides.iter().copied().filter(|g| g.is_finite()))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        if hi > lo {
            Some((lo, hi))
        } else {
            let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
            Some((lo - pad, hi + pad))
        }
    }

    pub fn render(&self) -> AnalyzerResult<String> {
        let (lo, hi) = self
            .value_range()
            .ok_or_else(|| AnalyzerError::no_data(format!("Nothing to plot for {}", self.title)))?;

        let points = self.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
        let cols = points.min(self.width).max(1);
        let last_row = self.height - 1;
        let row_of = |v: f64| ((hi - v) / (hi - lo) * last_row as f64).round() as usize;

        let mut grid = vec![vec![' '; cols]; self.height];
        for &g in &self.guides {
            if g.is_finite() {
                grid[row_of(g).min(last_row)].fill(GUIDE);
            }
        }
        for s in &self.series {
            for (col, cell) in sample(&s.values, cols).into_iter().enumerate() {
                if let Some(v) = cell.filter(|v| v.is_finite()) {
                    grid[row_of(v).min(last_row)][col] = s.glyph;
                }
            }
        }

        let mut out = format!("{}\n", self.title.bold());
        for (r, row) in grid.iter().enumerate() {
            let label = hi - r as f64 * (hi - lo) / last_row as f64;
            let line: String = row.iter().collect();
            out.push_str(&format!("{:>w$.2} |{}\n", label, line, w = LABEL_WIDTH));
        }
        out.push_str(&format!("{:>w$} +{}\n", "", "-".repeat(cols), w = LABEL_WIDTH));

        if let Some((start, end)) = self.dates {
            let start = start.to_string();
            let pad = cols.saturating_sub(start.len());
            out.push_str(&format!(
                "{:>w$}  {}{:>pad$}\n",
                "",
                start,
                end.to_string(),
                w = LABEL_WIDTH,
                pad = pad
            ));
        }

        let legend: Vec<String> = self
            .series
            .iter()
            .map(|s| format!("{} {}", s.glyph, s.label))
            .collect();
        out.push_str(&format!("{:>w$}  {}", "", legend.join("   "), w = LABEL_WIDTH));
        Ok(out)
    }
}

/// Pick `cols` evenly spaced slots, first and last included
fn sample(values: &[Option<f64>], cols: usize) -> Vec<Option<f64>> {
    let n = values.len();
    if n == 0 {
        return vec![None; cols];
    }
    (0..cols)
        .map(|c| {
            let idx = if cols == 1 { n - 1 } else { c * (n - 1) / (cols - 1) };
            values.get(idx).copied().flatten()
        })
        .collect()
}

/// VIX and VIX3M levels, then the VIX3M/VIX ratio against the 1.0 line
pub fn vix_ratio_chart(points: &[RatioPoint]) -> AnalyzerResult<String> {
    let (first, last) = match (points.first(), points.last()) {
        (Some(f), Some(l)) => (f.date, l.date),
        _ => return Err(AnalyzerError::no_data("No VIX ratio points to plot")),
    };

    let levels = LineChart::new("VIX vs VIX3M")
        .series("VIX", '*', points.iter().map(|p| Some(p.vix)).collect())
        .series("VIX3M", 'o', points.iter().map(|p| Some(p.vix3m)).collect())
        .dates(first, last)
        .render()?;

    let ratio = LineChart::new("VIX3M / VIX ratio (above 1.0 = contango)")
        .series("ratio", '*', points.iter().map(|p| Some(p.ratio)).collect())
        .guide(1.0)
        .dates(first, last)
        .render()?;

    Ok(format!("{levels}\n\n{ratio}"))
}

/// Price with moving averages and Bollinger bands, RSI with 30/70 guides,
/// and MACD against its signal line
pub fn ta_chart(series: &PriceSeries) -> AnalyzerResult<String> {
    if series.len() < TA_MIN_BARS {
        return Err(AnalyzerError::insufficient(TA_MIN_BARS, series.len()));
    }
    let closes = series.closes();
    let (first, last) = match (series.bars.first(), series.bars.last()) {
        (Some(f), Some(l)) => (f.date(), l.date()),
        _ => return Err(AnalyzerError::no_data(format!("No bars for {}", series.symbol))),
    };

    let bands = bollinger_series(&closes, BOLLINGER_WINDOW, BOLLINGER_STD_DEVS);
    let price = LineChart::new(format!("{} price", series.symbol))
        .series("BB upper", '^', bands.iter().map(|b| b.map(|b| b.upper)).collect())
        .series("BB lower", 'v', bands.iter().map(|b| b.map(|b| b.lower)).collect())
        .series("SMA 50", 's', sma_series(&closes, 50)?)
        .series("EMA 50", 'e', ema_series(&closes, 50)?)
        .series("Close", '*', closes.iter().map(|c| Some(*c)).collect())
        .dates(first, last)
        .render()?;

    let rsi = LineChart::new("RSI (14)")
        .size(8, DEFAULT_WIDTH)
        .series("RSI", '*', rsi_series(&closes, 14)?)
        .guide(30.0)
        .guide(70.0)
        .dates(first, last)
        .render()?;

    let macd_values = macd_series(&closes, &MacdParams::default())?;
    let macd = LineChart::new("MACD (12, 26, 9)")
        .size(8, DEFAULT_WIDTH)
        .guide(0.0)
        .series("MACD", '*', macd_values.iter().map(|m| m.map(|m| m.macd_line)).collect())
        .series("Signal", 'o', macd_values.iter().map(|m| m.map(|m| m.signal_line)).collect())
        .dates(first, last)
        .render()?;

    Ok(format!("{price}\n\n{rsi}\n\n{macd}"))
}
