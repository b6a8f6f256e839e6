//! Ironfly strike selection
//!
//! Short straddle at the at-the-money strike, long put and long call
//! `wing_width` away on either side, priced from the nearest expiry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{AnchorPrice, IronflyConfig};
use crate::core::{AnalyzerError, AnalyzerResult, OptionChain, OptionChainRow, OptionType, SpotQuote};
use crate::data::{resolve_symbol, MarketData};

/// Selected strikes and quotes for one ironfly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IronflyResult {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub atm_strike: f64,
    pub lower_wing_strike: f64,
    pub upper_wing_strike: f64,
    pub atm_call_bid: f64,
    pub atm_put_bid: f64,
    pub upper_call_ask: f64,
    pub lower_put_ask: f64,
    /// Credit when positive, debit when negative
    pub net_price: f64,
    pub used_fallback: bool,
}

impl IronflyResult {
    pub fn is_credit(&self) -> bool {
        self.net_price > 0.0
    }
}

/// Pick the ironfly strikes from a single-expiry chain.
///
/// The ATM strike is the strike listed on both sides nearest to
/// `underlying_price`; an exact tie goes to the lower strike. Missing
/// bid/ask quotes on a selected row price as 0.
pub fn select_ironfly(
    underlying_price: f64,
    chain: &OptionChain,
    wing_width: f64,
) -> AnalyzerResult<IronflyResult> {
    if !(wing_width > 0.0) {
        return Err(AnalyzerError::invalid_input(format!(
            "wing width must be positive, got {wing_width}"
        )));
    }

    let atm_strike = chain
        .common_strikes()
        .into_iter()
        .fold(None, |best: Option<f64>, k| match best {
            Some(b) if (b - underlying_price).abs() <= (k - underlying_price).abs() => Some(b),
            _ => Some(k),
        })
        .ok_or_else(|| {
            AnalyzerError::no_data(format!(
                "No strikes listed on both sides for {} {}",
                chain.underlying, chain.expiry
            ))
        })?;

    let lower_wing_strike = atm_strike - wing_width;
    let upper_wing_strike = atm_strike + wing_width;

    let atm_call = require(chain, atm_strike, OptionType::Call)?;
    let atm_put = require(chain, atm_strike, OptionType::Put)?;
    let lower_put = require(chain, lower_wing_strike, OptionType::Put)?;
    let upper_call = require(chain, upper_wing_strike, OptionType::Call)?;

    let atm_call_bid = atm_call.bid.unwrap_or(0.0);
    let atm_put_bid = atm_put.bid.unwrap_or(0.0);
    let upper_call_ask = upper_call.ask.unwrap_or(0.0);
    let lower_put_ask = lower_put.ask.unwrap_or(0.0);

    Ok(IronflyResult {
        symbol: chain.underlying.clone(),
        expiry: chain.expiry,
        atm_strike,
        lower_wing_strike,
        upper_wing_strike,
        atm_call_bid,
        atm_put_bid,
        upper_call_ask,
        lower_put_ask,
        net_price: (atm_call_bid + atm_put_bid) - (upper_call_ask + lower_put_ask),
        used_fallback: false,
    })
}

fn require(chain: &OptionChain, strike: f64, option_type: OptionType) -> AnalyzerResult<&OptionChainRow> {
    chain
        .row(strike, option_type)
        .ok_or(AnalyzerError::MissingStrike { strike, option_type })
}

/// Run `attempt` for `primary`; when that instrument has no usable data,
/// run it once more for `fallback`.
///
/// Returns the value and whether the fallback produced it. Errors other
/// than "unavailable" on the primary are returned as-is. A failed fallback
/// is reported as [`AnalyzerError::NoData`] naming both failures.
pub fn with_fallback<T, F>(primary: &str, fallback: &str, mut attempt: F) -> AnalyzerResult<(T, bool)>
where
    F: FnMut(&str) -> AnalyzerResult<T>,
{
    let primary_err = match attempt(primary) {
        Ok(value) => return Ok((value, false)),
        Err(e) if e.is_unavailable() && primary != fallback => e,
        Err(e) => return Err(e),
    };

    tracing::warn!(
        "No usable data for {}, falling back to {}: {}",
        primary,
        fallback,
        primary_err
    );

    attempt(fallback).map(|value| (value, true)).map_err(|fallback_err| {
        AnalyzerError::no_data(format!(
            "{primary}: {primary_err}; fallback {fallback}: {fallback_err}"
        ))
    })
}

/// Anchor price for the ironfly centre
pub fn anchor_price(quote: &SpotQuote, anchor: AnchorPrice) -> f64 {
    match anchor {
        AnchorPrice::Last => quote.price,
        AnchorPrice::Open => match quote.open {
            Some(open) if open > 0.0 => open,
            _ => {
                tracing::debug!(symbol = %quote.symbol, "no session open, anchoring on last price");
                quote.price
            }
        },
    }
}

/// Fetch the nearest-expiry chain for `symbol` and select the ironfly
pub fn ironfly_for_symbol<P: MarketData + ?Sized>(
    provider: &P,
    symbol: &str,
    wing_width: f64,
    anchor: AnchorPrice,
    today: NaiveDate,
) -> AnalyzerResult<IronflyResult> {
    let quote = provider.quote(symbol)?;
    let expiry = provider.nearest_expiry(symbol, today)?;
    let chain = provider.option_chain(symbol, expiry)?;
    if chain.is_empty() {
        return Err(AnalyzerError::no_data(format!("Empty option chain for {symbol} {expiry}")));
    }

    let price = anchor_price(&quote, anchor);
    tracing::debug!(symbol, price, %expiry, rows = chain.len(), "selecting ironfly");
    select_ironfly(price, &chain, wing_width)
}

/// Ironfly for a user ticker, substituting the configured fallback
/// instrument when the ticker has no option data
pub fn analyze_ironfly<P: MarketData + ?Sized>(
    provider: &P,
    ticker: &str,
    wing_width: f64,
    config: &IronflyConfig,
    today: NaiveDate,
) -> AnalyzerResult<IronflyResult> {
    let primary = resolve_symbol(ticker);
    let (mut result, used_fallback) = with_fallback(primary, &config.fallback_symbol, |symbol| {
        ironfly_for_symbol(provider, symbol, wing_width, config.anchor, today)
    })?;
    result.used_fallback = used_fallback;

    tracing::info!(
        symbol = %result.symbol,
        atm = result.atm_strike,
        net = result.net_price,
        used_fallback,
        "ironfly selected"
    );
    Ok(result)
}
