//! Yahoo Finance data fetcher
//!
//! Quotes, daily history and option chains from Yahoo Finance's unofficial
//! API.
//!
//! Note: Yahoo Finance data is delayed ~15 minutes and intended for
//! personal use.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use super::{fetch_text, http_client, parse_body, validate_period, MarketData};
use crate::config::HttpConfig;
use crate::core::{
    AnalyzerError, AnalyzerResult, OptionChain, OptionChainRow, OptionType, PriceBar,
    PriceSeries, SpotQuote,
};

const PROVIDER: &str = "Yahoo";

/// Yahoo Finance API client
pub struct YahooClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(config: &HttpConfig) -> AnalyzerResult<Self> {
        Self::with_base_url(config, "https://query1.finance.yahoo.com")
    }

    pub fn with_base_url(config: &HttpConfig, base_url: impl Into<String>) -> AnalyzerResult<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: base_url.into(),
        })
    }

    fn get(&self, url: &str) -> AnalyzerResult<String> {
        tracing::debug!(url, "Yahoo request");
        fetch_text(PROVIDER, self.client.get(url))
    }
}

impl MarketData for YahooClient {
    /// Get current quote for a symbol
    fn quote(&self, symbol: &str) -> AnalyzerResult<SpotQuote> {
        let url = format!("{}/v7/finance/quote?symbols={}", self.base_url, symbol);
        parse_quote(symbol, &self.get(&url)?)
    }

    /// Get daily bars for a period
    fn history(&self, symbol: &str, period: &str) -> AnalyzerResult<PriceSeries> {
        validate_period(period)?;
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url, symbol, period
        );
        let series = parse_chart(symbol, &self.get(&url)?)?;
        tracing::debug!(symbol, period, bars = series.len(), "fetched history");
        Ok(series)
    }

    /// Get available option expiration dates
    fn expirations(&self, symbol: &str) -> AnalyzerResult<Vec<NaiveDate>> {
        let url = format!("{}/v7/finance/options/{}", self.base_url, symbol);
        parse_expirations(symbol, &self.get(&url)?)
    }

    /// Get option chain for a specific expiration
    fn option_chain(&self, symbol: &str, expiry: NaiveDate) -> AnalyzerResult<OptionChain> {
        // Yahoo keys expirations by midnight UTC of the expiry date
        let expiry_ts = expiry.and_time(NaiveTime::MIN).and_utc().timestamp();
        let url = format!(
            "{}/v7/finance/options/{}?date={}",
            self.base_url, symbol, expiry_ts
        );
        let chain = parse_option_chain(symbol, expiry, &self.get(&url)?)?;
        tracing::debug!(symbol, %expiry, rows = chain.len(), "fetched option chain");
        Ok(chain)
    }
}

/// Parse a `/v7/finance/quote` body
pub fn parse_quote(symbol: &str, body: &str) -> AnalyzerResult<SpotQuote> {
    let response: YahooQuoteResponse = parse_body(PROVIDER, body)?;

    let result = response
        .quote_response
        .result
        .into_iter()
        .next()
        .ok_or_else(|| AnalyzerError::no_data(format!("No quote data returned for {symbol}")))?;

    let price = result
        .regular_market_price
        .ok_or_else(|| AnalyzerError::no_data(format!("No market price for {symbol}")))?;

    Ok(SpotQuote {
        symbol: symbol.to_string(),
        price,
        open: result.regular_market_open,
        bid: result.bid,
        ask: result.ask,
        fifty_two_week_low: result.fifty_two_week_low,
        fifty_two_week_high: result.fifty_two_week_high,
        timestamp: Utc::now(),
    })
}

/// Parse a `/v8/finance/chart` body. Bars with a missing OHLC value are
/// skipped.
pub fn parse_chart(symbol: &str, body: &str) -> AnalyzerResult<PriceSeries> {
    let response: YahooChartResponse = parse_body(PROVIDER, body)?;

    if let Some(error) = response.chart.error {
        return Err(AnalyzerError::upstream(format!(
            "Yahoo chart error for {symbol}: {}",
            error.description.unwrap_or(error.code)
        )));
    }

    let data = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| AnalyzerError::no_data(format!("No history returned for {symbol}")))?;

    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let bars: Vec<PriceBar> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let at = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
            Some(PriceBar {
                timestamp: DateTime::from_timestamp(ts, 0)?,
                open: at(&quote.open)?,
                high: at(&quote.high)?,
                low: at(&quote.low)?,
                close: at(&quote.close)?,
                volume: at(&quote.volume).unwrap_or(0.0),
            })
        })
        .collect();

    if bars.is_empty() {
        return Err(AnalyzerError::no_data(format!("Empty history for {symbol}")));
    }

    Ok(PriceSeries::new(symbol, bars))
}

/// Parse the expiration list from a `/v7/finance/options` body
pub fn parse_expirations(symbol: &str, body: &str) -> AnalyzerResult<Vec<NaiveDate>> {
    let chain = first_chain(symbol, body)?;

    let mut expiries: Vec<NaiveDate> = chain
        .expiration_dates
        .iter()
        .filter_map(|&ts| DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()))
        .collect();
    expiries.sort();
    expiries.dedup();

    Ok(expiries)
}

/// Parse one expiry's chain from a `/v7/finance/options?date=` body
pub fn parse_option_chain(symbol: &str, expiry: NaiveDate, body: &str) -> AnalyzerResult<OptionChain> {
    let chain_data = first_chain(symbol, body)?;

    let spot = chain_data.quote.regular_market_price.unwrap_or(0.0);
    let mut chain = OptionChain::new(symbol, spot, expiry);

    if let Some(options) = chain_data.options.first() {
        for (contracts, option_type) in [(&options.calls, OptionType::Call), (&options.puts, OptionType::Put)] {
            for data in contracts {
                if let Some(row) = convert_option_row(data, expiry, option_type) {
                    chain.add_row(row);
                }
            }
        }
    }

    Ok(chain)
}

fn first_chain(symbol: &str, body: &str) -> AnalyzerResult<YahooOptionChainData> {
    let response: YahooOptionsResponse = parse_body(PROVIDER, body)?;
    response
        .option_chain
        .result
        .into_iter()
        .next()
        .ok_or_else(|| AnalyzerError::no_data(format!("No options data returned for {symbol}")))
}

/// Convert Yahoo option data to a chain row
fn convert_option_row(
    data: &YahooOptionData,
    expiry: NaiveDate,
    option_type: OptionType,
) -> Option<OptionChainRow> {
    let strike = data.strike?;

    let mut row = OptionChainRow::new(strike, expiry, option_type);
    row.bid = data.bid;
    row.ask = data.ask;
    row.last = data.last_price;
    Some(row)
}

// Yahoo Finance API response structures

#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: YahooQuoteResult,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResult {
    result: Vec<YahooQuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuoteData {
    regular_market_price: Option<f64>,
    regular_market_open: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    fifty_two_week_low: Option<f64>,
    fifty_two_week_high: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooChartData>>,
    error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YahooChartQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: YahooOptionChain,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChain {
    result: Vec<YahooOptionChainData>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChainData {
    #[serde(rename = "expirationDates", default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    quote: YahooQuoteData,
    #[serde(default)]
    options: Vec<YahooOptions>,
}

#[derive(Debug, Deserialize)]
struct YahooOptions {
    #[serde(default)]
    calls: Vec<YahooOptionData>,
    #[serde(default)]
    puts: Vec<YahooOptionData>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionData {
    strike: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    #[serde(rename = "lastPrice")]
    last_price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTE_BODY: &str = r#"{"quoteResponse":{"result":[{"symbol":"^VIX",
        "regularMarketPrice":15.2,"regularMarketOpen":15.9,"fiftyTwoWeekLow":11.5,
        "fiftyTwoWeekHigh":38.6}],"error":null}}"#;

    const CHART_BODY: &str = r#"{"chart":{"result":[{"meta":{"symbol":"SPY"},
        "timestamp":[1735828200,1735914600,1736173800],
        "indicators":{"quote":[{"open":[589.4,587.5,null],"high":[591.1,592.9,599.0],
        "low":[580.5,586.2,593.5],"close":[584.6,591.9,595.3],
        "volume":[50000000,40000000,45000000]}]}}],"error":null}}"#;

    const OPTIONS_BODY: &str = r#"{"optionChain":{"result":[{"underlyingSymbol":"SPY",
        "expirationDates":[1736985600,1736380800],
        "quote":{"regularMarketPrice":590.0},
        "options":[{"expirationDate":1736380800,
          "calls":[{"strike":585.0,"bid":7.1,"ask":7.3,"lastPrice":7.2},
                   {"strike":590.0,"bid":3.9,"ask":4.1},
                   {"bid":1.0,"ask":1.1}],
          "puts":[{"strike":590.0,"bid":3.6,"ask":3.8,"lastPrice":3.7}]}]}],"error":null}}"#;

    #[test]
    fn test_parse_quote() {
        let quote = parse_quote("^VIX", QUOTE_BODY).unwrap();
        assert_eq!(quote.price, 15.2);
        assert_eq!(quote.open, Some(15.9));
        assert_eq!(quote.fifty_two_week_high, Some(38.6));
        assert!(quote.bid.is_none());
    }

    #[test]
    fn test_parse_quote_empty_result() {
        let err = parse_quote("NOPE", r#"{"quoteResponse":{"result":[]}}"#).unwrap_err();
        assert!(matches!(err, AnalyzerError::NoData(_)));
    }

    #[test]
    fn test_parse_chart_skips_incomplete_bars() {
        let series = parse_chart("SPY", CHART_BODY).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![584.6, 591.9]);
        assert_eq!(series.bars[0].volume, 50_000_000.0);
    }

    #[test]
    fn test_parse_chart_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("ZZZZ", body).unwrap_err();
        assert!(matches!(err, AnalyzerError::Upstream(_)));
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_parse_expirations_sorted() {
        let expiries = parse_expirations("SPY", OPTIONS_BODY).unwrap();
        assert_eq!(
            expiries,
            vec![
                NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 16).unwrap(),
            ]
        );
    }

    #[test]
    fn test_parse_option_chain() {
        let expiry = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        let chain = parse_option_chain("SPY", expiry, OPTIONS_BODY).unwrap();

        assert_eq!(chain.spot, 590.0);
        // Row without a strike is dropped
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.call_at(585.0).unwrap().last, Some(7.2));
        assert_eq!(chain.put_at(590.0).unwrap().bid, Some(3.6));
        assert_eq!(chain.common_strikes(), vec![590.0]);
    }

    #[test]
    #[ignore] // Requires network
    fn test_get_quote() {
        let client = YahooClient::new(&HttpConfig::default()).unwrap();
        let quote = client.quote("SPY").unwrap();

        assert!(quote.price > 0.0);
        println!("SPY price: {}", quote.price);
    }

    #[test]
    #[ignore] // Requires network
    fn test_get_option_chain() {
        let client = YahooClient::new(&HttpConfig::default()).unwrap();
        let today = Utc::now().date_naive();
        let expiry = client.nearest_expiry("SPY", today).unwrap();
        let chain = client.option_chain("SPY", expiry).unwrap();

        println!("Chain for {}: {} rows", expiry, chain.len());
        assert!(!chain.is_empty());
    }
}
