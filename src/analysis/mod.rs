//! Analyses over fetched market data
//!
//! - Indicator engine: moving averages, RSI, MACD, Bollinger, stochastic, ADX
//! - Classical pivot points
//! - Ironfly strike selection with instrument fallback
//! - Lexicon sentiment scoring and ticker-mention aggregation
//! - Volatility index snapshots, VIX term structure and bond yield summaries

pub mod indicators;
pub mod pivots;
pub mod ironfly;
pub mod sentiment;
pub mod volatility;
pub mod bonds;

pub use indicators::{compute_indicators, IndicatorSet, IndicatorWindows, MacdParams};
pub use pivots::{pivot_points, PivotPoints};
pub use ironfly::{analyze_ironfly, select_ironfly, with_fallback, IronflyResult};
pub use sentiment::{
    aggregate_sentiment, extract_candidate_symbols, ScoredHeadline, SentimentAnalyzer,
    SentimentRecord, SentimentScores, STOPWORDS,
};
pub use volatility::{vix_ratio, vix_ratio_history, volatility_snapshots, RatioPoint, VolatilitySnapshot};
pub use bonds::{recent_by_date, BOND_DATES_SHOWN};
