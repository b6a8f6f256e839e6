//! Application configuration
//!
//! Layered once at startup: built-in defaults, an optional TOML file, then
//! `MARKET_ANALYZER__SECTION__KEY` environment variables. Missing credentials
//! only fail the feature that needs them.

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::analysis::indicators::{IndicatorWindows, MacdParams};
use crate::core::{AnalyzerError, AnalyzerResult};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MARKET_ANALYZER";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub reddit: RedditConfig,
    pub news: NewsConfig,
    pub ironfly: IronflyConfig,
    pub indicators: IndicatorConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    /// Load from `config/default.toml` (if present) and the environment
    pub fn load() -> AnalyzerResult<Self> {
        Self::load_from(Path::new("config/default.toml"), false)
    }

    /// Load from a specific file; `required` makes a missing file an error
    pub fn load_from(path: &Path, required: bool) -> AnalyzerResult<Self> {
        let builder = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("indicators.sma_windows")
                    .with_list_parse_key("indicators.ema_windows")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity checks on values a user can get wrong
    pub fn validate(&self) -> AnalyzerResult<()> {
        if self.http.timeout_secs == 0 {
            return Err(AnalyzerError::configuration("http.timeout_secs must be > 0"));
        }
        if self.reddit.hot_limit == 0 {
            return Err(AnalyzerError::configuration("reddit.hot_limit must be > 0"));
        }
        let windows = self.indicators.windows();
        if windows.macd.fast >= windows.macd.slow {
            return Err(AnalyzerError::configuration(
                "indicators.macd_fast must be smaller than indicators.macd_slow",
            ));
        }
        if windows
            .sma_windows
            .iter()
            .chain(windows.ema_windows.iter())
            .chain(std::iter::once(&windows.rsi_window))
            .any(|&w| w == 0)
        {
            return Err(AnalyzerError::configuration("indicator windows must be > 0"));
        }
        Ok(())
    }
}

impl From<ConfigError> for AnalyzerError {
    fn from(e: ConfigError) -> Self {
        AnalyzerError::Configuration(e.to_string())
    }
}

/// Shared HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

/// Reddit API credentials and sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub user_agent: String,
    pub subreddit: String,
    /// Number of hot submissions to sample
    pub hot_limit: usize,
    /// Symbols need more than this many mentions to be reported
    pub min_mentions: usize,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            user_agent: "market-analyzer/0.1".to_string(),
            subreddit: "wallstreetbets".to_string(),
            hot_limit: 20,
            min_mentions: 5,
        }
    }
}

impl RedditConfig {
    /// (client_id, client_secret), or a configuration error naming the key
    pub fn credentials(&self) -> AnalyzerResult<(&str, &str)> {
        let id = required_secret(self.client_id.as_deref(), "reddit.client_id")?;
        let secret = required_secret(self.client_secret.as_deref(), "reddit.client_secret")?;
        Ok((id, secret))
    }
}

/// NewsAPI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub api_key: Option<String>,
    /// Look-back window for ticker searches
    pub days_back: i64,
    pub max_articles: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            days_back: 7,
            max_articles: 10,
        }
    }
}

impl NewsConfig {
    pub fn api_key(&self) -> AnalyzerResult<&str> {
        required_secret(self.api_key.as_deref(), "news.api_key")
    }
}

/// Which underlying price the ironfly is centred on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPrice {
    /// Regular market price
    #[default]
    Last,
    /// Session open
    Open,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IronflyConfig {
    /// Instrument substituted when the primary has no option chain
    pub fallback_symbol: String,
    pub anchor: AnchorPrice,
}

impl Default for IronflyConfig {
    fn default() -> Self {
        Self {
            fallback_symbol: "SPY".to_string(),
            anchor: AnchorPrice::Last,
        }
    }
}

/// Flat, file-friendly form of [`IndicatorWindows`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma_windows: Vec<usize>,
    pub ema_windows: Vec<usize>,
    pub rsi_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        let windows = IndicatorWindows::default();
        Self {
            sma_windows: windows.sma_windows,
            ema_windows: windows.ema_windows,
            rsi_window: windows.rsi_window,
            macd_fast: windows.macd.fast,
            macd_slow: windows.macd.slow,
            macd_signal: windows.macd.signal,
        }
    }
}

impl IndicatorConfig {
    pub fn windows(&self) -> IndicatorWindows {
        IndicatorWindows {
            sma_windows: self.sma_windows.clone(),
            ema_windows: self.ema_windows.clone(),
            rsi_window: self.rsi_window,
            macd: MacdParams {
                fast: self.macd_fast,
                slow: self.macd_slow,
                signal: self.macd_signal,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: "./analysis_results".to_string(),
        }
    }
}

/// Empty values and the `your_...` placeholders shipped in sample configs
/// count as missing.
fn required_secret<'a>(value: Option<&'a str>, key: &str) -> AnalyzerResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() && !v.to_ascii_lowercase().starts_with("your_") => Ok(v),
        _ => Err(AnalyzerError::configuration(format!(
            "{key} is not set (config file or {ENV_PREFIX}__{} env var)",
            key.replace('.', "__").to_ascii_uppercase()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ironfly.fallback_symbol, "SPY");
        assert_eq!(config.indicators.sma_windows, vec![50, 200]);
        assert_eq!(config.reddit.min_mentions, 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[news]
api_key = "abc123"
max_articles = 5

[ironfly]
fallback_symbol = "XSP"
anchor = "open"

[indicators]
sma_windows = [10, 20]
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path(), true).unwrap();
        assert_eq!(config.news.api_key().unwrap(), "abc123");
        assert_eq!(config.news.max_articles, 5);
        assert_eq!(config.news.days_back, 7);
        assert_eq!(config.ironfly.fallback_symbol, "XSP");
        assert_eq!(config.ironfly.anchor, AnchorPrice::Open);
        assert_eq!(config.indicators.windows().sma_windows, vec![10, 20]);
        assert_eq!(config.indicators.rsi_window, 14);
    }

    #[test]
    fn test_missing_required_file() {
        let result = AppConfig::load_from(Path::new("/nonexistent/market.toml"), true);
        assert!(matches!(result, Err(AnalyzerError::Configuration(_))));
    }

    #[test]
    fn test_placeholder_credentials_rejected() {
        let reddit = RedditConfig {
            client_id: Some("your_reddit_client_id".into()),
            client_secret: Some("secret".into()),
            ..Default::default()
        };
        let err = reddit.credentials().unwrap_err();
        assert!(err.to_string().contains("reddit.client_id"));

        let news = NewsConfig::default();
        assert!(matches!(news.api_key(), Err(AnalyzerError::Configuration(_))));
    }

    #[test]
    fn test_invalid_macd_rejected() {
        let mut config = AppConfig::default();
        config.indicators.macd_fast = 30;
        assert!(config.validate().is_err());
    }
}
