//! CNBC RSS feed reader
//!
//! The feed is small and flat, so items are pulled out with a few regexes
//! rather than a full XML parser.

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{fetch_text, http_client};
use crate::config::HttpConfig;
use crate::core::{AnalyzerError, AnalyzerResult, NewsHeadline};

const PROVIDER: &str = "CNBC";

/// Top news feed
pub const CNBC_FEED_URL: &str = "https://www.cnbc.com/id/10000664/device/rss/rss.html";

pub struct CnbcClient {
    client: reqwest::blocking::Client,
}

impl CnbcClient {
    pub fn new(config: &HttpConfig) -> AnalyzerResult<Self> {
        Ok(Self {
            client: http_client(config)?,
        })
    }

    /// The first `limit` feed entries
    pub fn latest(&self, limit: usize) -> AnalyzerResult<Vec<NewsHeadline>> {
        let body = fetch_text(PROVIDER, self.client.get(CNBC_FEED_URL))?;
        let mut items = parse_feed(&body)?;
        items.truncate(limit);
        tracing::debug!(items = items.len(), "parsed CNBC feed");
        Ok(items)
    }
}

/// Parse RSS `<item>` elements. Items without a title are skipped; a feed
/// with no items at all is [`AnalyzerError::NoData`].
pub fn parse_feed(body: &str) -> AnalyzerResult<Vec<NewsHeadline>> {
    let item_re = compile(r"(?s)<item\b[^>]*>(.*?)</item>")?;
    let title_re = tag_pattern("title")?;
    let link_re = tag_pattern("link")?;
    let description_re = tag_pattern("description")?;
    let date_re = tag_pattern("pubDate")?;

    let mut items = Vec::new();
    for item in item_re.captures_iter(body) {
        let xml = &item[1];
        let Some(title) = element(xml, &title_re) else {
            continue;
        };
        if title.is_empty() {
            continue;
        }

        items.push(NewsHeadline {
            title,
            source: PROVIDER.to_string(),
            published_at: element(xml, &date_re)
                .and_then(|d| DateTime::parse_from_rfc2822(&d).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            url: element(xml, &link_re).unwrap_or_default(),
            description: element(xml, &description_re).filter(|d| !d.is_empty()),
        });
    }

    if items.is_empty() {
        return Err(AnalyzerError::no_data("CNBC feed contained no items"));
    }
    Ok(items)
}

fn compile(pattern: &str) -> AnalyzerResult<Regex> {
    Regex::new(pattern).map_err(|e| AnalyzerError::invalid_input(format!("bad pattern: {e}")))
}

fn tag_pattern(tag: &str) -> AnalyzerResult<Regex> {
    compile(&format!(r"(?s)<{tag}\b[^>]*>(.*?)</{tag}>"))
}

/// Text content of the first element matched by `re` in `xml`, CDATA
/// unwrapped and entities decoded
fn element(xml: &str, re: &Regex) -> Option<String> {
    re.captures(xml).map(|c| {
        let raw = c[1].trim();
        let raw = raw
            .strip_prefix("<![CDATA[")
            .and_then(|r| r.strip_suffix("]]>"))
            .unwrap_or(raw);
        decode_entities(raw.trim())
    })
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
