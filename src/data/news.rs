//! NewsAPI client
//!
//! Two endpoints: `everything` for ticker-specific articles over a recent
//! window and `top-headlines` for general business news.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;

use super::{fetch_with_credentials, http_client, parse_body};
use crate::config::{HttpConfig, NewsConfig};
use crate::core::{AnalyzerError, AnalyzerResult, NewsHeadline};

const PROVIDER: &str = "NewsAPI";

pub struct NewsClient {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    days_back: i64,
    page_size: usize,
}

impl NewsClient {
    /// Fails with a configuration error when no usable API key is set
    pub fn new(news: &NewsConfig, http: &HttpConfig) -> AnalyzerResult<Self> {
        let api_key = news.api_key()?.to_string();
        Ok(Self {
            client: http_client(http)?,
            api_key,
            base_url: "https://newsapi.org/v2".to_string(),
            days_back: news.days_back,
            page_size: news.max_articles,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Most relevant English articles mentioning `query` since `today - days_back`
    pub fn search(&self, query: &str, today: NaiveDate) -> AnalyzerResult<Vec<NewsHeadline>> {
        let from = today - Duration::days(self.days_back);
        let page_size = self.page_size.to_string();
        let from = from.format("%Y-%m-%d").to_string();

        tracing::debug!(query, from = %from, "NewsAPI search");
        let body = fetch_with_credentials(
            PROVIDER,
            self.client
                .get(format!("{}/everything", self.base_url))
                .header("X-Api-Key", &self.api_key)
                .query(&[
                    ("q", query),
                    ("from", from.as_str()),
                    ("language", "en"),
                    ("sortBy", "relevancy"),
                    ("pageSize", page_size.as_str()),
                ]),
        )?;

        let mut articles = parse_articles(&body)?;
        articles.truncate(self.page_size);
        Ok(articles)
    }

    /// Current US business headlines
    pub fn top_headlines(&self) -> AnalyzerResult<Vec<NewsHeadline>> {
        let page_size = self.page_size.to_string();
        let body = fetch_with_credentials(
            PROVIDER,
            self.client
                .get(format!("{}/top-headlines", self.base_url))
                .header("X-Api-Key", &self.api_key)
                .query(&[
                    ("country", "us"),
                    ("category", "business"),
                    ("pageSize", page_size.as_str()),
                ]),
        )?;

        let mut articles = parse_articles(&body)?;
        articles.truncate(self.page_size);
        Ok(articles)
    }
}

/// Parse an articles response. An `"status": "error"` body becomes an
/// upstream error carrying the provider's message.
pub fn parse_articles(body: &str) -> AnalyzerResult<Vec<NewsHeadline>> {
    let response: ArticlesResponse = parse_body(PROVIDER, body)?;

    if response.status != "ok" {
        let message = response.message.unwrap_or_else(|| "unknown error".to_string());
        return Err(match response.code.as_deref() {
            Some("apiKeyInvalid") | Some("apiKeyMissing") | Some("apiKeyDisabled") => {
                AnalyzerError::configuration(format!("NewsAPI key rejected: {message}"))
            }
            _ => AnalyzerError::upstream(format!("NewsAPI error: {message}")),
        });
    }

    Ok(response
        .articles
        .into_iter()
        .filter_map(|a| {
            let title = a.title?.trim().to_string();
            // NewsAPI blanks out removed articles instead of dropping them
            if title.is_empty() || title == "[Removed]" {
                return None;
            }
            Some(NewsHeadline {
                title,
                source: a.source.and_then(|s| s.name).unwrap_or_default(),
                published_at: a
                    .published_at
                    .as_deref()
                    .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                url: a.url.unwrap_or_default(),
                description: a.description.filter(|d| !d.trim().is_empty()),
            })
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct ArticlesResponse {
    status: String,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    source: Option<ArticleSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"status":"ok","totalResults":3,"articles":[
        {"source":{"id":null,"name":"Reuters"},"author":"x","title":"Stocks rally on strong earnings",
         "description":"Shares gained broadly.","url":"https://example.com/a","publishedAt":"2025-01-15T14:30:00Z"},
        {"source":{"id":null,"name":"[Removed]"},"title":"[Removed]","description":null,"url":"https://removed.com","publishedAt":"1970-01-01T00:00:00Z"},
        {"source":{"name":"CNBC"},"title":"Fed holds rates","description":"  ","url":"https://example.com/b","publishedAt":null}
    ]}"#;

    #[test]
    fn test_parse_articles() {
        let articles = parse_articles(BODY).unwrap();
        assert_eq!(articles.len(), 2);

        assert_eq!(articles[0].source, "Reuters");
        assert_eq!(
            articles[0].scoring_text(),
            "Stocks rally on strong earnings. Shares gained broadly."
        );
        assert!(articles[0].published_at.is_some());

        assert_eq!(articles[1].title, "Fed holds rates");
        assert!(articles[1].description.is_none());
        assert!(articles[1].published_at.is_none());
    }

    #[test]
    fn test_parse_error_status() {
        let err = parse_articles(
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::Configuration(_)));

        let err = parse_articles(
            r#"{"status":"error","code":"rateLimited","message":"Too many requests"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::Upstream(_)));
    }

    #[test]
    fn test_client_requires_key() {
        let result = NewsClient::new(&NewsConfig::default(), &HttpConfig::default());
        assert!(matches!(result, Err(AnalyzerError::Configuration(_))));
    }

    #[test]
    fn test_rejected_key_is_configuration_error() {
        let base = crate::data::serve_once(
            "401 Unauthorized",
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid"}"#,
        );
        let config = NewsConfig {
            api_key: Some("not-a-key".to_string()),
            ..NewsConfig::default()
        };
        let client = NewsClient::new(&config, &HttpConfig::default())
            .unwrap()
            .with_base_url(base);

        let err = client.top_headlines().unwrap_err();
        assert!(matches!(err, AnalyzerError::Configuration(_)));
    }

    #[test]
    #[ignore] // Requires network and a NewsAPI key
    fn test_live_top_headlines() {
        let config = crate::config::AppConfig::load().unwrap();
        let client = NewsClient::new(&config.news, &config.http).unwrap();
        let headlines = client.top_headlines().unwrap();
        assert!(!headlines.is_empty());
    }
}
