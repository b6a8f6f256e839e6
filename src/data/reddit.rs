//! Reddit API client
//!
//! Application-only OAuth (client credentials), then the hot listing of a
//! subreddit and the top-level comments of each submission. Deeper replies
//! and "load more" stubs are not followed.

use serde::Deserialize;

use super::{fetch_text, fetch_with_credentials, http_client, parse_body};
use crate::config::{HttpConfig, RedditConfig};
use crate::core::{AnalyzerError, AnalyzerResult, Post, Topic};

const PROVIDER: &str = "Reddit";

/// A hot submission
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub url: String,
}

impl Submission {
    pub fn topic(&self) -> Topic {
        Topic {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// Authenticated Reddit session
pub struct RedditClient {
    client: reqwest::blocking::Client,
    token: String,
    user_agent: String,
    api_url: String,
}

impl RedditClient {
    /// Authenticate with the configured app credentials
    pub fn connect(reddit: &RedditConfig, http: &HttpConfig) -> AnalyzerResult<Self> {
        let (client_id, client_secret) = reddit.credentials()?;
        let client = http_client(http)?;

        let body = fetch_with_credentials(
            PROVIDER,
            client
                .post("https://www.reddit.com/api/v1/access_token")
                .header(reqwest::header::USER_AGENT, &reddit.user_agent)
                .basic_auth(client_id, Some(client_secret))
                .form(&[("grant_type", "client_credentials")]),
        )?;
        let token = parse_token(&body)?;
        tracing::debug!("Reddit session established");

        Ok(Self {
            client,
            token,
            user_agent: reddit.user_agent.clone(),
            api_url: "https://oauth.reddit.com".to_string(),
        })
    }

    fn get(&self, url: &str) -> AnalyzerResult<String> {
        tracing::debug!(url, "Reddit request");
        fetch_text(
            PROVIDER,
            self.client
                .get(url)
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .bearer_auth(&self.token),
        )
    }

    /// Hot submissions of a subreddit
    pub fn hot(&self, subreddit: &str, limit: usize) -> AnalyzerResult<Vec<Submission>> {
        let url = format!("{}/r/{}/hot?limit={}", self.api_url, subreddit, limit);
        let mut submissions = parse_hot_listing(&self.get(&url)?)?;
        submissions.truncate(limit);
        Ok(submissions)
    }

    /// Top-level comments of a submission as posts
    pub fn top_level_comments(&self, subreddit: &str, submission_id: &str) -> AnalyzerResult<Vec<Post>> {
        let url = format!(
            "{}/r/{}/comments/{}?depth=1&limit=500",
            self.api_url, subreddit, submission_id
        );
        parse_comments(&self.get(&url)?)
    }

    /// Hot topics plus the top-level comments under them.
    /// A submission whose comments fail to load is skipped with a warning.
    pub fn hot_posts(&self, subreddit: &str, limit: usize) -> AnalyzerResult<(Vec<Topic>, Vec<Post>)> {
        let submissions = self.hot(subreddit, limit)?;
        let topics = submissions.iter().map(Submission::topic).collect();

        let mut posts = Vec::new();
        for submission in &submissions {
            match self.top_level_comments(subreddit, &submission.id) {
                Ok(mut comments) => posts.append(&mut comments),
                Err(e) => tracing::warn!("Skipping comments for {}: {}", submission.id, e),
            }
        }

        tracing::info!(
            submissions = submissions.len(),
            comments = posts.len(),
            "collected Reddit posts"
        );
        Ok((topics, posts))
    }
}

/// Parse an access-token response
pub fn parse_token(body: &str) -> AnalyzerResult<String> {
    let response: TokenResponse = parse_body(PROVIDER, body)?;
    match (response.access_token, response.error) {
        (Some(token), _) if !token.is_empty() => Ok(token),
        (_, Some(error)) => Err(AnalyzerError::configuration(format!(
            "Reddit rejected the credentials: {}",
            error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string())
        ))),
        _ => Err(AnalyzerError::upstream("Reddit token response had no access_token")),
    }
}

/// Parse a subreddit listing into submissions
pub fn parse_hot_listing(body: &str) -> AnalyzerResult<Vec<Submission>> {
    let listing: Listing<SubmissionData> = parse_body(PROVIDER, body)?;
    Ok(listing
        .data
        .children
        .into_iter()
        .filter(|c| c.kind == "t3")
        .filter_map(|c| c.data)
        .map(|d| Submission {
            id: d.id,
            title: d.title,
            url: d.url.unwrap_or_default(),
        })
        .collect())
}

/// Parse a comments page (`[submission listing, comment listing]`) into
/// top-level comment posts
pub fn parse_comments(body: &str) -> AnalyzerResult<Vec<Post>> {
    let pages: Vec<Listing<CommentData>> = parse_body(PROVIDER, body)?;
    let comments = pages
        .into_iter()
        .nth(1)
        .ok_or_else(|| AnalyzerError::upstream("Reddit comments page had no comment listing"))?;

    Ok(comments
        .data
        .children
        .into_iter()
        .filter(|c| c.kind == "t1")
        .filter_map(|c| c.data)
        .filter_map(|d| {
            let body = d.body?;
            let text = body.trim();
            if text.is_empty() {
                return None;
            }
            Some(Post {
                id: d.id,
                title: String::new(),
                text: text.to_string(),
                url: d.permalink.map(|p| format!("https://www.reddit.com{p}")).unwrap_or_default(),
            })
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    // a string from the token endpoint, a status number from the API gateway
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
struct ListingData<T> {
    children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
struct Thing<T> {
    kind: String,
    // "more" stubs carry a different payload; keep them out of the way
    #[serde(default = "none", deserialize_with = "lenient")]
    data: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Deserialize)]
struct SubmissionData {
    id: String,
    title: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    id: String,
    body: Option<String>,
    permalink: Option<String>,
}
