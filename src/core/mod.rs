//! Core data types
//!
//! Defines the records every other module passes around:
//! - OptionChainRow / OptionChain: one expiry of listed contracts
//! - SpotQuote / PriceBar / PriceSeries: underlying market data
//! - Post / NewsHeadline / YieldPoint: non-market provider records
//! - AnalyzerError: the error taxonomy

pub mod option;
pub mod quote;
pub mod records;
pub mod error;

pub use option::*;
pub use quote::*;
pub use records::*;
pub use error::*;
