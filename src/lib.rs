//! # Market Analyzer
//!
//! Pulls quotes, option chains, volatility indices, Treasury yields, Reddit
//! posts and news headlines from public HTTP APIs, runs well-known
//! calculations over them and prints terminal reports.
//!
//! ## Key Components
//!
//! - **Data Fetching**: Yahoo Finance, Treasury FiscalData, Reddit, NewsAPI
//!   and the CNBC RSS feed, each behind a blocking client
//! - **Indicators**: SMA, EMA, RSI, MACD, Bollinger, stochastic, ADX and
//!   classical pivot points
//! - **Ironfly**: ATM strike selection with wing pricing and an instrument
//!   fallback
//! - **Sentiment**: lexicon scoring of posts and headlines, ticker mention
//!   ranking
//! - **Report**: tables, ASCII charts, CSV/JSON export
//!
//! ## Usage
//!
//! ```rust,no_run
//! use market_analyzer::prelude::*;
//!
//! let config = AppConfig::load().unwrap();
//! let provider = CachedMarketData::new(YahooClient::new(&config.http).unwrap());
//!
//! let result = analyze_ironfly(
//!     &provider,
//!     "$SPX.X",
//!     50.0,
//!     &config.ironfly,
//!     chrono::Local::now().date_naive(),
//! )
//! .unwrap();
//! println!("{}", ironfly_table(&result));
//! ```
//!
//! ## What This Tool Does NOT Do
//!
//! - Place orders or manage positions
//! - Persist anything beyond one-way exports
//! - Stream data; every run is a single snapshot

pub mod analysis;
pub mod config;
pub mod core;
pub mod data;
pub mod report;
pub mod runner;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        AnalyzerError, AnalyzerResult, NewsHeadline, OptionChain, OptionChainRow, OptionType,
        Post, PriceBar, PriceSeries, SpotQuote, Topic, YieldPoint,
    };

    // Configuration
    pub use crate::config::{AnchorPrice, AppConfig};

    // Data fetching
    pub use crate::data::{
        resolve_symbol, CachedMarketData, CnbcClient, MarketData, NewsClient, RedditClient,
        TreasuryClient, YahooClient,
    };

    // Analyses
    pub use crate::analysis::{
        aggregate_sentiment, analyze_ironfly, compute_indicators, extract_candidate_symbols,
        pivot_points, select_ironfly, vix_ratio_history, volatility_snapshots, with_fallback,
        IndicatorSet, IndicatorWindows, IronflyResult, PivotPoints, SentimentAnalyzer,
        SentimentRecord,
    };

    // Report
    pub use crate::report::{ironfly_table, load_json, Exporter};

    // Runner
    pub use crate::runner::{Analyzer, RunOptions, RunReport, Section};
}

pub use crate::core::{AnalyzerError, AnalyzerResult};
