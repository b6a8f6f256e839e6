//! Data fetching
//!
//! Handles:
//! - Yahoo Finance for quotes, daily history and option chains
//! - Treasury FiscalData for average interest rates
//! - Reddit and NewsAPI / CNBC RSS for sentiment inputs
//! - A per-run quote cache in front of the market data provider
//!
//! Every client parses provider JSON into the typed records in
//! [`crate::core`] at the boundary; a shape mismatch is an
//! [`AnalyzerError::Upstream`].

pub mod yahoo;
pub mod cache;
pub mod treasury;
pub mod reddit;
pub mod news;
pub mod cnbc;

pub use yahoo::*;
pub use cache::*;
pub use treasury::*;
pub use reddit::*;
pub use news::*;
pub use cnbc::*;

use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use crate::config::HttpConfig;
use crate::core::{AnalyzerError, AnalyzerResult, OptionChain, PriceSeries, SpotQuote};

/// Market data provider: quotes, history and option chains
pub trait MarketData {
    /// Current quote for a symbol
    fn quote(&self, symbol: &str) -> AnalyzerResult<SpotQuote>;

    /// Daily bars over a provider period string (`5d`, `6mo`, `1y`, ...)
    fn history(&self, symbol: &str, period: &str) -> AnalyzerResult<PriceSeries>;

    /// Listed option expirations, ascending
    fn expirations(&self, symbol: &str) -> AnalyzerResult<Vec<NaiveDate>>;

    /// Option chain for one expiry
    fn option_chain(&self, symbol: &str, expiry: NaiveDate) -> AnalyzerResult<OptionChain>;

    /// First listed expiry on or after `from`
    fn nearest_expiry(&self, symbol: &str, from: NaiveDate) -> AnalyzerResult<NaiveDate> {
        self.expirations(symbol)?
            .into_iter()
            .filter(|e| *e >= from)
            .min()
            .ok_or_else(|| AnalyzerError::no_data(format!("No option expirations listed for {symbol}")))
    }
}

/// Periods the history endpoint accepts
pub const VALID_PERIODS: &[&str] = &[
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];

pub fn validate_period(period: &str) -> AnalyzerResult<()> {
    if VALID_PERIODS.contains(&period) {
        Ok(())
    } else {
        Err(AnalyzerError::invalid_input(format!(
            "Unknown period '{period}', expected one of {}",
            VALID_PERIODS.join(", ")
        )))
    }
}

/// Map broker-style index tickers (`$SPX.X`) to Yahoo symbols (`^GSPC`).
/// Unknown tickers pass through unchanged.
pub fn resolve_symbol(ticker: &str) -> &str {
    match ticker {
        "$SPX.X" => "^GSPC",
        "$VIX.X" => "^VIX",
        "$VIX3M.X" => "^VIX3M",
        "$VVIX.X" => "^VVIX",
        "$SKEW.X" => "^SKEW",
        "$VXN.X" => "^VXN",
        "$TNX.X" => "^TNX",
        "$IRX.X" => "^IRX",
        "$FVX.X" => "^FVX",
        "$TYX.X" => "^TYX",
        "$COMPX" => "^IXIC",
        "$NDX.X" => "^NDX",
        other => other,
    }
}

/// Blocking HTTP client shared by the provider clients
pub fn http_client(config: &HttpConfig) -> AnalyzerResult<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| AnalyzerError::upstream(format!("Failed to create HTTP client: {e}")))
}

/// Parse a provider body, reporting shape mismatches as upstream errors
pub(crate) fn parse_body<T: DeserializeOwned>(provider: &str, body: &str) -> AnalyzerResult<T> {
    serde_json::from_str(body)
        .map_err(|e| AnalyzerError::upstream(format!("Unexpected {provider} response: {e}")))
}

fn send(
    provider: &str,
    request: reqwest::blocking::RequestBuilder,
) -> AnalyzerResult<(reqwest::StatusCode, String)> {
    let response = request
        .send()
        .map_err(|e| AnalyzerError::upstream(format!("{provider} request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .map_err(|e| AnalyzerError::upstream(format!("{provider} body unreadable: {e}")))?;
    Ok((status, body))
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Send a request and return the body, mapping HTTP failures to upstream errors
pub(crate) fn fetch_text(
    provider: &str,
    request: reqwest::blocking::RequestBuilder,
) -> AnalyzerResult<String> {
    let (status, body) = send(provider, request)?;
    if !status.is_success() {
        return Err(AnalyzerError::upstream(format!(
            "{provider} returned HTTP {status}: {}",
            snippet(&body)
        )));
    }

    tracing::debug!(provider, bytes = body.len(), "fetched response");
    Ok(body)
}

/// Like [`fetch_text`] for keyed providers: 401 and 403 mean the configured
/// credentials were refused and surface as configuration errors
pub(crate) fn fetch_with_credentials(
    provider: &str,
    request: reqwest::blocking::RequestBuilder,
) -> AnalyzerResult<String> {
    let (status, body) = send(provider, request)?;
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AnalyzerError::configuration(format!(
            "{provider} rejected the credentials (HTTP {status}): {}",
            snippet(&body)
        )));
    }
    if !status.is_success() {
        return Err(AnalyzerError::upstream(format!(
            "{provider} returned HTTP {status}: {}",
            snippet(&body)
        )));
    }

    tracing::debug!(provider, bytes = body.len(), "fetched response");
    Ok(body)
}

/// One-shot local HTTP server answering the first request with a canned
/// response. Returns the base URL.
#[cfg(test)]
pub(crate) fn serve_once(status_line: &'static str, body: &'static str) -> String {
    use std::io::{Read, Write};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 8192];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });
    format!("http://{addr}")
}
