//! Per-run quote caching
//!
//! Several sections ask for the same quote in one invocation (the ironfly
//! anchor, the volatility table, the Reddit price column). The cache keeps
//! the first answer for the rest of the run; nothing is written to disk.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::NaiveDate;

use super::MarketData;
use crate::core::{AnalyzerResult, OptionChain, PriceSeries, SpotQuote};

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache quotes
    pub quotes: bool,
    /// Cache expiration lists
    pub expirations: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            quotes: true,
            expirations: true,
        }
    }
}

/// Cached market data - combines a cache with live fetching
pub struct CachedMarketData<P> {
    inner: P,
    config: CacheConfig,
    quotes: RefCell<HashMap<String, SpotQuote>>,
    expirations: RefCell<HashMap<String, Vec<NaiveDate>>>,
}

impl<P: MarketData> CachedMarketData<P> {
    pub fn new(inner: P) -> Self {
        Self::with_config(inner, CacheConfig::default())
    }

    pub fn with_config(inner: P, config: CacheConfig) -> Self {
        Self {
            inner,
            config,
            quotes: RefCell::new(HashMap::new()),
            expirations: RefCell::new(HashMap::new()),
        }
    }

    /// The wrapped provider
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of cached quotes
    pub fn cached_quotes(&self) -> usize {
        self.quotes.borrow().len()
    }

    /// Drop everything cached so far
    pub fn clear(&self) {
        self.quotes.borrow_mut().clear();
        self.expirations.borrow_mut().clear();
    }
}

impl<P: MarketData> MarketData for CachedMarketData<P> {
    fn quote(&self, symbol: &str) -> AnalyzerResult<SpotQuote> {
        if self.config.quotes {
            if let Some(quote) = self.quotes.borrow().get(symbol) {
                tracing::debug!(symbol, "using cached quote");
                return Ok(quote.clone());
            }
        }

        let quote = self.inner.quote(symbol)?;
        if self.config.quotes {
            self.quotes
                .borrow_mut()
                .insert(symbol.to_string(), quote.clone());
        }
        Ok(quote)
    }

    fn history(&self, symbol: &str, period: &str) -> AnalyzerResult<PriceSeries> {
        self.inner.history(symbol, period)
    }

    fn expirations(&self, symbol: &str) -> AnalyzerResult<Vec<NaiveDate>> {
        if self.config.expirations {
            if let Some(expiries) = self.expirations.borrow().get(symbol) {
                return Ok(expiries.clone());
            }
        }

        let expiries = self.inner.expirations(symbol)?;
        if self.config.expirations {
            self.expirations
                .borrow_mut()
                .insert(symbol.to_string(), expiries.clone());
        }
        Ok(expiries)
    }

    fn option_chain(&self, symbol: &str, expiry: NaiveDate) -> AnalyzerResult<OptionChain> {
        self.inner.option_chain(symbol, expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AnalyzerError;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingProvider {
        quote_calls: Cell<usize>,
        expiry_calls: Cell<usize>,
    }

    impl MarketData for CountingProvider {
        fn quote(&self, symbol: &str) -> AnalyzerResult<SpotQuote> {
            self.quote_calls.set(self.quote_calls.get() + 1);
            if symbol == "FAIL" {
                return Err(AnalyzerError::upstream("boom"));
            }
            Ok(SpotQuote::new(symbol, 100.0))
        }

        fn history(&self, _symbol: &str, _period: &str) -> AnalyzerResult<PriceSeries> {
            Err(AnalyzerError::no_data("unused"))
        }

        fn expirations(&self, _symbol: &str) -> AnalyzerResult<Vec<NaiveDate>> {
            self.expiry_calls.set(self.expiry_calls.get() + 1);
            Ok(vec![NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()])
        }

        fn option_chain(&self, symbol: &str, expiry: NaiveDate) -> AnalyzerResult<OptionChain> {
            Ok(OptionChain::new(symbol, 100.0, expiry))
        }
    }

    #[test]
    fn test_quote_cached_once() {
        let cached = CachedMarketData::new(CountingProvider::default());

        cached.quote("SPY").unwrap();
        cached.quote("SPY").unwrap();
        cached.quote("QQQ").unwrap();

        assert_eq!(cached.inner().quote_calls.get(), 2);
        assert_eq!(cached.cached_quotes(), 2);
    }

    #[test]
    fn test_errors_not_cached() {
        let cached = CachedMarketData::new(CountingProvider::default());

        assert!(cached.quote("FAIL").is_err());
        assert!(cached.quote("FAIL").is_err());

        assert_eq!(cached.inner().quote_calls.get(), 2);
        assert_eq!(cached.cached_quotes(), 0);
    }

    #[test]
    fn test_disabled_cache_passes_through() {
        let cached = CachedMarketData::with_config(
            CountingProvider::default(),
            CacheConfig {
                quotes: false,
                expirations: false,
            },
        );

        cached.quote("SPY").unwrap();
        cached.quote("SPY").unwrap();
        cached.expirations("SPY").unwrap();
        cached.expirations("SPY").unwrap();

        assert_eq!(cached.inner().quote_calls.get(), 2);
        assert_eq!(cached.inner().expiry_calls.get(), 2);
    }

    #[test]
    fn test_nearest_expiry_uses_cache() {
        let cached = CachedMarketData::new(CountingProvider::default());
        let from = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        let first = cached.nearest_expiry("SPY", from).unwrap();
        let second = cached.nearest_expiry("SPY", from).unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner().expiry_calls.get(), 1);

        cached.clear();
        cached.nearest_expiry("SPY", from).unwrap();
        assert_eq!(cached.inner().expiry_calls.get(), 2);
    }
}
