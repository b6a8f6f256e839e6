//! Option chain definitions
//!
//! One row per listed contract for a single expiry, as delivered by the
//! quote provider.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Strikes closer than this are the same strike.
pub const STRIKE_TOLERANCE: f64 = 0.001;

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn label(&self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single listed contract with its market quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChainRow {
    /// Strike price
    pub strike: f64,
    /// Expiration date
    pub expiry: NaiveDate,
    /// Option type (Call/Put)
    pub option_type: OptionType,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    /// Last traded price
    pub last: Option<f64>,
}

impl OptionChainRow {
    pub fn new(strike: f64, expiry: NaiveDate, option_type: OptionType) -> Self {
        Self {
            strike,
            expiry,
            option_type,
            bid: None,
            ask: None,
            last: None,
        }
    }

    /// Builder-style quote setter
    pub fn with_quote(mut self, bid: f64, ask: f64) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    fn matches(&self, strike: f64, option_type: OptionType) -> bool {
        self.option_type == option_type && (self.strike - strike).abs() < STRIKE_TOLERANCE
    }
}

/// An option chain for a single expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChain {
    /// Underlying symbol
    pub underlying: String,
    /// Underlying spot at fetch time (0.0 when the provider omits it)
    pub spot: f64,
    /// Expiration date
    pub expiry: NaiveDate,
    /// Rows, unique per (strike, type)
    pub rows: Vec<OptionChainRow>,
    /// Timestamp when fetched
    pub timestamp: DateTime<Utc>,
}

impl OptionChain {
    pub fn new(underlying: impl Into<String>, spot: f64, expiry: NaiveDate) -> Self {
        Self {
            underlying: underlying.into(),
            spot,
            expiry,
            rows: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Add a row. A later row for an existing (strike, type) replaces it.
    pub fn add_row(&mut self, row: OptionChainRow) {
        if let Some(existing) = self
            .rows
            .iter_mut()
            .find(|r| r.matches(row.strike, row.option_type))
        {
            *existing = row;
        } else {
            self.rows.push(row);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Row for the given strike and type
    pub fn row(&self, strike: f64, option_type: OptionType) -> Option<&OptionChainRow> {
        self.rows.iter().find(|r| r.matches(strike, option_type))
    }

    pub fn call_at(&self, strike: f64) -> Option<&OptionChainRow> {
        self.row(strike, OptionType::Call)
    }

    pub fn put_at(&self, strike: f64) -> Option<&OptionChainRow> {
        self.row(strike, OptionType::Put)
    }

    /// Sorted strikes for one side of the chain
    pub fn strikes(&self, option_type: OptionType) -> Vec<f64> {
        let mut strikes: Vec<f64> = self
            .rows
            .iter()
            .filter(|r| r.option_type == option_type)
            .map(|r| r.strike)
            .collect();
        strikes.sort_by(f64::total_cmp);
        strikes.dedup_by(|a, b| (*a - *b).abs() < STRIKE_TOLERANCE);
        strikes
    }

    /// Sorted strikes listed on both the call and the put side
    pub fn common_strikes(&self) -> Vec<f64> {
        let puts = self.strikes(OptionType::Put);
        self.strikes(OptionType::Call)
            .into_iter()
            .filter(|k| puts.iter().any(|p| (p - k).abs() < STRIKE_TOLERANCE))
            .collect()
    }
}
