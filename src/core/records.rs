//! Plain records from the non-market providers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A social post or top-level comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    /// Body text scanned for tickers and scored for sentiment
    pub text: String,
    pub url: String,
}

impl Post {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            text: text.into(),
            url: String::new(),
        }
    }
}

/// A hot submission listed alongside the sentiment table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub url: String,
}

/// A news article headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsHeadline {
    pub title: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub url: String,
    pub description: Option<String>,
}

impl NewsHeadline {
    /// Text used for sentiment scoring: "title. description"
    pub fn scoring_text(&self) -> String {
        match self.description.as_deref() {
            Some(d) if !d.trim().is_empty() => format!("{}. {}", self.title, d),
            _ => self.title.clone(),
        }
    }
}

/// Treasury average interest rate record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldPoint {
    pub record_date: NaiveDate,
    pub security_type: String,
    pub security_desc: String,
    /// Percent
    pub rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_text() {
        let mut headline = NewsHeadline {
            title: "Stocks rally".into(),
            source: "Wire".into(),
            published_at: None,
            url: "https://example.com".into(),
            description: Some("Indexes close higher".into()),
        };
        assert_eq!(headline.scoring_text(), "Stocks rally. Indexes close higher");

        headline.description = Some("  ".into());
        assert_eq!(headline.scoring_text(), "Stocks rally");
    }
}
