//! Treasury FiscalData client
//!
//! The daily par yield curve endpoint is unreliable, so this reads the
//! "Average Interest Rates on U.S. Treasury Securities" dataset instead.

use chrono::NaiveDate;
use serde::Deserialize;

use super::{fetch_text, http_client, parse_body};
use crate::config::HttpConfig;
use crate::core::{AnalyzerError, AnalyzerResult, YieldPoint};

const PROVIDER: &str = "Treasury FiscalData";

pub struct TreasuryClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl TreasuryClient {
    pub fn new(config: &HttpConfig) -> AnalyzerResult<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: "https://api.fiscaldata.treasury.gov/services/api/fiscal_service".to_string(),
        })
    }

    /// Average interest rates recorded on or after `since`, newest first
    pub fn average_interest_rates(&self, since: NaiveDate) -> AnalyzerResult<Vec<YieldPoint>> {
        let url = format!(
            "{}/v2/accounting/od/avg_interest_rates?filter=record_date:gte:{}&sort=-record_date",
            self.base_url,
            since.format("%Y-%m-%d")
        );
        tracing::debug!(url, "Treasury request");

        let points = parse_avg_interest_rates(&fetch_text(PROVIDER, self.client.get(&url))?)?;
        tracing::debug!(records = points.len(), "fetched bond yields");
        Ok(points)
    }
}

/// Parse an `avg_interest_rates` body. Rates arrive as strings; records
/// with an unparseable date are skipped, a missing rate reads as 0.
pub fn parse_avg_interest_rates(body: &str) -> AnalyzerResult<Vec<YieldPoint>> {
    let response: FiscalDataResponse = parse_body(PROVIDER, body)?;

    let points: Vec<YieldPoint> = response
        .data
        .into_iter()
        .filter_map(|entry| {
            let record_date = NaiveDate::parse_from_str(&entry.record_date, "%Y-%m-%d").ok()?;
            let rate = entry
                .avg_interest_rate_amt
                .as_deref()
                .and_then(|r| r.trim().parse::<f64>().ok())
                .unwrap_or(0.0);
            Some(YieldPoint {
                record_date,
                security_type: entry.security_type_desc.unwrap_or_default(),
                security_desc: entry.security_desc.unwrap_or_default(),
                rate,
            })
        })
        .collect();

    if points.is_empty() {
        return Err(AnalyzerError::no_data("No bond yield records returned"));
    }

    Ok(points)
}

#[derive(Debug, Deserialize)]
struct FiscalDataResponse {
    data: Vec<FiscalDataRecord>,
}

#[derive(Debug, Deserialize)]
struct FiscalDataRecord {
    record_date: String,
    security_type_desc: Option<String>,
    security_desc: Option<String>,
    avg_interest_rate_amt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_avg_interest_rates() {
        let body = r#"{"data":[
            {"record_date":"2025-01-31","security_type_desc":"Marketable","security_desc":"Treasury Bills","avg_interest_rate_amt":"4.418"},
            {"record_date":"2025-01-31","security_type_desc":"Non-marketable","security_desc":"Domestic Series","avg_interest_rate_amt":null},
            {"record_date":"bad","security_type_desc":"Marketable","security_desc":"Treasury Notes","avg_interest_rate_amt":"3.1"}
        ],"meta":{"count":3}}"#;

        let points = parse_avg_interest_rates(body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].record_date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert!((points[0].rate - 4.418).abs() < 1e-12);
        assert_eq!(points[1].rate, 0.0);
        assert_eq!(points[1].security_desc, "Domestic Series");
    }

    #[test]
    fn test_parse_empty() {
        let err = parse_avg_interest_rates(r#"{"data":[]}"#).unwrap_err();
        assert!(matches!(err, AnalyzerError::NoData(_)));
    }

    #[test]
    fn test_parse_wrong_shape() {
        let err = parse_avg_interest_rates(r#"{"records":[]}"#).unwrap_err();
        assert!(matches!(err, AnalyzerError::Upstream(_)));
    }
}
