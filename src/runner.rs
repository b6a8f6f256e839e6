//! Section runner behind the `market-analyzer` binary
//!
//! Every requested section runs on its own: a failure is printed in red and
//! recorded, and the remaining sections still run. The exit code is 0 when
//! every section succeeded and 1 otherwise.

use std::io::Write;

use chrono::NaiveDate;
use colored::Colorize;

use crate::analysis::bonds::bond_history_start;
use crate::analysis::sentiment::mean_compound;
use crate::analysis::{
    aggregate_sentiment, analyze_ironfly, compute_indicators, extract_candidate_symbols,
    pivot_points, recent_by_date, vix_ratio_history, volatility_snapshots, ScoredHeadline,
    SentimentAnalyzer, BOND_DATES_SHOWN, STOPWORDS,
};
use crate::config::AppConfig;
use crate::core::{AnalyzerResult, NewsHeadline};
use crate::data::{
    resolve_symbol, validate_period, CnbcClient, MarketData, NewsClient, RedditClient,
    TreasuryClient,
};
use crate::report::{
    bond_table, headline_list, headline_table, indicator_metrics, indicator_table, ironfly_table,
    pivot_metrics, pivot_table, section_header, sentiment_legend, sentiment_table, ta_chart,
    topic_list, vix_ratio_chart, volatility_table, Exporter,
};

/// History period for pivot points; the prior session must be complete
const PIVOT_PERIOD: &str = "5d";
/// Long enough for the 200-day averages
const INDICATOR_PERIOD: &str = "1y";
const CNBC_ITEMS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Ironfly,
    MarketIndicators,
    BondYields,
    PivotPoints,
    TechnicalIndicators,
    RedditSentiment,
    NewsSentiment,
    CnbcSentiment,
    TopHeadlines,
    VixRatioPlot,
    TaPlot,
}

impl Section {
    /// Sections run by default
    pub const CORE: [Section; 5] = [
        Section::Ironfly,
        Section::MarketIndicators,
        Section::BondYields,
        Section::PivotPoints,
        Section::TechnicalIndicators,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Ironfly => "Ironfly",
            Section::MarketIndicators => "Market Indicators",
            Section::BondYields => "Bond Yields",
            Section::PivotPoints => "Pivot Points",
            Section::TechnicalIndicators => "Technical Indicators",
            Section::RedditSentiment => "Reddit Sentiment",
            Section::NewsSentiment => "News Sentiment",
            Section::CnbcSentiment => "CNBC Sentiment",
            Section::TopHeadlines => "Top Headlines",
            Section::VixRatioPlot => "VIX Ratio",
            Section::TaPlot => "Technical Analysis Plot",
        }
    }
}

/// What the user asked for on the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub ticker: String,
    pub wings: f64,
    pub core: bool,
    pub reddit: bool,
    pub news: bool,
    pub cnbc: bool,
    pub top_headlines: bool,
    /// Narrows top headlines to one symbol
    pub headline_symbol: Option<String>,
    pub plot_vix_ratio: bool,
    pub vix_period: String,
    pub plot_ta: bool,
    pub ta_period: String,
    pub export: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticker: "$SPX.X".to_string(),
            wings: 50.0,
            core: true,
            reddit: false,
            news: false,
            cnbc: false,
            top_headlines: false,
            headline_symbol: None,
            plot_vix_ratio: false,
            vix_period: "1y".to_string(),
            plot_ta: false,
            ta_period: "1y".to_string(),
            export: false,
        }
    }
}

impl RunOptions {
    /// Requested sections in output order
    pub fn sections(&self) -> Vec<Section> {
        let mut sections = Vec::new();
        if self.core {
            sections.extend(Section::CORE);
        }
        let optional = [
            (self.reddit, Section::RedditSentiment),
            (self.news, Section::NewsSentiment),
            (self.cnbc, Section::CnbcSentiment),
            (self.top_headlines, Section::TopHeadlines),
            (self.plot_vix_ratio, Section::VixRatioPlot),
            (self.plot_ta, Section::TaPlot),
        ];
        sections.extend(optional.into_iter().filter(|(on, _)| *on).map(|(_, s)| s));
        sections
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionOutcome {
    pub section: Section,
    /// Error message when the section failed
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<SectionOutcome>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &SectionOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }

    pub fn exit_code(&self) -> i32 {
        if self.failures().next().is_some() {
            1
        } else {
            0
        }
    }
}

/// Runs sections against one market data provider
pub struct Analyzer<'a, P> {
    provider: P,
    config: &'a AppConfig,
    today: NaiveDate,
    exporter: Option<Exporter>,
}

impl<'a, P: MarketData> Analyzer<'a, P> {
    pub fn new(provider: P, config: &'a AppConfig, today: NaiveDate) -> Self {
        Self {
            provider,
            config,
            today,
            exporter: None,
        }
    }

    /// Write every section's results to `exporter` as well
    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Run every requested section, writing the report to `out`.
    /// Only a failure to write the report itself is returned as an error.
    pub fn run<W: Write>(&self, options: &RunOptions, out: &mut W) -> AnalyzerResult<RunReport> {
        let mut report = RunReport::default();

        for section in options.sections() {
            writeln!(out, "\n{}", section_header(section.title()))?;

            let error = match self.section(section, options) {
                Ok(body) => {
                    writeln!(out, "{body}")?;
                    None
                }
                Err(e) => {
                    tracing::warn!(section = section.title(), "section failed: {}", e);
                    writeln!(out, "{}", format!("{} failed: {}", section.title(), e).red())?;
                    Some(e.to_string())
                }
            };
            report.outcomes.push(SectionOutcome { section, error });
        }

        tracing::info!(
            sections = report.outcomes.len(),
            failed = report.failures().count(),
            "run finished"
        );
        Ok(report)
    }

    /// Render one section
    pub fn section(&self, section: Section, options: &RunOptions) -> AnalyzerResult<String> {
        match section {
            Section::Ironfly => self.ironfly(options),
            Section::MarketIndicators => self.market_indicators(),
            Section::BondYields => self.bond_yields(),
            Section::PivotPoints => self.pivots(options),
            Section::TechnicalIndicators => self.indicators(options),
            Section::RedditSentiment => self.reddit(),
            Section::NewsSentiment => self.news(options),
            Section::CnbcSentiment => self.cnbc(),
            Section::TopHeadlines => self.top_headlines(options),
            Section::VixRatioPlot => self.vix_ratio(options),
            Section::TaPlot => self.ta_plot(options),
        }
    }

    fn ironfly(&self, options: &RunOptions) -> AnalyzerResult<String> {
        let result = analyze_ironfly(
            &self.provider,
            &options.ticker,
            options.wings,
            &self.config.ironfly,
            self.today,
        )?;
        let saved = self.export("ironfly", &result.symbol, &result, std::slice::from_ref(&result))?;
        Ok(ironfly_table(&result) + &saved)
    }

    fn market_indicators(&self) -> AnalyzerResult<String> {
        let snapshots = volatility_snapshots(&self.provider)?;
        let saved = self.export("market_indicators", "volatility", &snapshots, &snapshots)?;
        Ok(volatility_table(&snapshots) + &saved)
    }

    fn bond_yields(&self) -> AnalyzerResult<String> {
        let mut points = TreasuryClient::new(&self.config.http)?.average_interest_rates(bond_history_start())?;
        points.sort_by(|a, b| b.record_date.cmp(&a.record_date));
        let recent = recent_by_date(&points, BOND_DATES_SHOWN);

        let saved = self.export("bond_yields", "treasury", &recent, &recent)?;
        Ok(bond_table(&recent) + &saved)
    }

    fn pivots(&self, options: &RunOptions) -> AnalyzerResult<String> {
        let symbol = resolve_symbol(&options.ticker);
        let pivots = pivot_points(&self.provider.history(symbol, PIVOT_PERIOD)?)?;

        let saved = self.export("pivots", &options.ticker, &pivots, &pivot_metrics(&pivots))?;
        Ok(pivot_table(symbol, &pivots) + &saved)
    }

    fn indicators(&self, options: &RunOptions) -> AnalyzerResult<String> {
        let symbol = resolve_symbol(&options.ticker);
        let series = self.provider.history(symbol, INDICATOR_PERIOD)?;
        let set = compute_indicators(&series, &self.config.indicators.windows())?;

        let mut rows = indicator_metrics(&set);
        rows.extend(pivot_metrics(&set.pivot_points));
        let saved = self.export("indicators", &options.ticker, &set, &rows)?;
        Ok(indicator_table(symbol, &set) + &saved)
    }

    fn reddit(&self) -> AnalyzerResult<String> {
        let reddit = &self.config.reddit;
        let client = RedditClient::connect(reddit, &self.config.http)?;
        let (topics, posts) = client.hot_posts(&reddit.subreddit, reddit.hot_limit)?;

        let vocabulary = extract_candidate_symbols(&posts, STOPWORDS);
        let mut records: Vec<_> = aggregate_sentiment(&posts, &vocabulary)
            .into_iter()
            .filter(|r| r.mention_count > reddit.min_mentions)
            .collect();
        for record in &mut records {
            record.last_price = match self.provider.quote(&record.symbol) {
                Ok(q) => Some(q.price),
                Err(e) => {
                    tracing::debug!(symbol = %record.symbol, "no quote: {}", e);
                    None
                }
            };
        }

        let saved = self.export("reddit", &reddit.subreddit, &records, &records)?;
        Ok(format!(
            "Hot topics in r/{}\n{}\n\n{}\n{}{}",
            reddit.subreddit,
            topic_list(&topics),
            sentiment_table(&records),
            sentiment_legend(),
            saved
        ))
    }

    fn news(&self, options: &RunOptions) -> AnalyzerResult<String> {
        let query = news_query(&options.ticker);
        let articles = NewsClient::new(&self.config.news, &self.config.http)?.search(&query, self.today)?;
        self.scored_headlines("news", &query, &articles)
    }

    fn cnbc(&self) -> AnalyzerResult<String> {
        let items = CnbcClient::new(&self.config.http)?.latest(CNBC_ITEMS)?;
        self.scored_headlines("cnbc", "feed", &items)
    }

    fn scored_headlines(&self, kind: &str, symbol: &str, headlines: &[NewsHeadline]) -> AnalyzerResult<String> {
        let scored: Vec<ScoredHeadline> = SentimentAnalyzer::new().score_headlines(headlines);
        let average = match mean_compound(&scored) {
            Some(m) => format!("Average compound: {m:.3}"),
            None => "No headlines to score".to_string(),
        };

        let saved = self.export(kind, symbol, &scored, &scored)?;
        Ok(format!(
            "{}\n{}\n{}{}",
            headline_table(&scored),
            average,
            sentiment_legend(),
            saved
        ))
    }

    fn top_headlines(&self, options: &RunOptions) -> AnalyzerResult<String> {
        let client = NewsClient::new(&self.config.news, &self.config.http)?;
        let headlines = match options.headline_symbol.as_deref() {
            Some(symbol) => client.search(symbol, self.today)?,
            None => client.top_headlines()?,
        };
        Ok(headline_list(&headlines))
    }

    fn vix_ratio(&self, options: &RunOptions) -> AnalyzerResult<String> {
        validate_period(&options.vix_period)?;
        let points = vix_ratio_history(&self.provider, &options.vix_period)?;

        let saved = self.export("vix_ratio", &options.vix_period, &points, &points)?;
        Ok(vix_ratio_chart(&points)? + &saved)
    }

    fn ta_plot(&self, options: &RunOptions) -> AnalyzerResult<String> {
        validate_period(&options.ta_period)?;
        let series = self.provider.history(resolve_symbol(&options.ticker), &options.ta_period)?;
        ta_chart(&series)
    }

    /// Export when enabled; returns a note naming the written files
    fn export<T, R>(&self, kind: &str, symbol: &str, value: &T, rows: &[R]) -> AnalyzerResult<String>
    where
        T: serde::Serialize + ?Sized,
        R: serde::Serialize,
    {
        let Some(exporter) = &self.exporter else {
            return Ok(String::new());
        };
        let paths = exporter.export(kind, symbol, value, rows)?;
        let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        tracing::info!(kind, symbol, "exported results");
        Ok(format!("\nExported: {}", names.join(", ")))
    }
}

/// Search term for a ticker: `$SPX.X` -> `SPX`, `^VIX` -> `VIX`
fn news_query(ticker: &str) -> String {
    let bare = ticker.trim_start_matches(['$', '^']);
    bare.strip_suffix(".X").unwrap_or(bare).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AnalyzerError, OptionChain, OptionChainRow, OptionType, PriceBar, PriceSeries, SpotQuote};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 21).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 18).unwrap()
    }

    /// Serves `^GSPC` and the volatility indices; everything else is missing
    struct FakeProvider;

    impl MarketData for FakeProvider {
        fn quote(&self, symbol: &str) -> AnalyzerResult<SpotQuote> {
            match symbol {
                "^GSPC" => Ok(SpotQuote::new(symbol, 100.2)),
                "^VIX" | "^VIX3M" | "^VVIX" | "^SKEW" | "^VXN" => Ok(SpotQuote::new(symbol, 18.0)),
                _ => Err(AnalyzerError::no_data(format!("unknown {symbol}"))),
            }
        }

        fn history(&self, symbol: &str, _period: &str) -> AnalyzerResult<PriceSeries> {
            let start = Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap();
            let base = match symbol {
                "^GSPC" => 100.0,
                "^VIX" => 16.0,
                "^VIX3M" => 18.0,
                _ => return Err(AnalyzerError::no_data(format!("no history for {symbol}"))),
            };
            let bars = (0..250)
                .map(|i| {
                    let close = base + (i as f64 * 0.2).sin() * 2.0;
                    PriceBar {
                        timestamp: start + Duration::days(i),
                        open: close,
                        high: close + 1.0,
                        low: close - 1.0,
                        close,
                        volume: 1_000.0,
                    }
                })
                .collect();
            Ok(PriceSeries::new(symbol, bars))
        }

        fn expirations(&self, _symbol: &str) -> AnalyzerResult<Vec<NaiveDate>> {
            Ok(vec![expiry()])
        }

        fn option_chain(&self, symbol: &str, expiry: NaiveDate) -> AnalyzerResult<OptionChain> {
            if symbol != "^GSPC" {
                return Err(AnalyzerError::no_data(format!("no chain for {symbol}")));
            }
            let mut chain = OptionChain::new(symbol, 100.2, expiry);
            for strike in (80..=120).step_by(5).map(f64::from) {
                chain.add_row(OptionChainRow::new(strike, expiry, OptionType::Call).with_quote(2.0, 2.2));
                chain.add_row(OptionChainRow::new(strike, expiry, OptionType::Put).with_quote(1.8, 2.0));
            }
            Ok(chain)
        }
    }

    fn options() -> RunOptions {
        RunOptions {
            wings: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_sections_in_order() {
        let mut opts = RunOptions {
            core: false,
            ..Default::default()
        };
        assert!(opts.sections().is_empty());

        opts.plot_ta = true;
        opts.reddit = true;
        assert_eq!(opts.sections(), vec![Section::RedditSentiment, Section::TaPlot]);

        assert_eq!(RunOptions::default().sections(), Section::CORE.to_vec());
    }

    #[test]
    fn test_exit_codes() {
        let ok = SectionOutcome {
            section: Section::Ironfly,
            error: None,
        };
        let failed = SectionOutcome {
            section: Section::BondYields,
            error: Some("Upstream error: 503".into()),
        };

        assert_eq!(RunReport::default().exit_code(), 0);
        assert_eq!(RunReport { outcomes: vec![ok.clone()] }.exit_code(), 0);
        assert_eq!(RunReport { outcomes: vec![ok, failed] }.exit_code(), 1);
    }

    #[test]
    fn test_core_sections_with_fake_provider() {
        colored::control::set_override(false);
        let config = AppConfig::default();
        let analyzer = Analyzer::new(FakeProvider, &config, today());
        let opts = options();

        let ironfly = analyzer.section(Section::Ironfly, &opts).unwrap();
        assert!(ironfly.contains("^GSPC expiring 2025-03-21"));
        assert!(ironfly.contains("Ironfly price: $-0.40 debit"));

        let vol = analyzer.section(Section::MarketIndicators, &opts).unwrap();
        assert!(vol.contains("NASDAQ VIX"));

        let pivots = analyzer.section(Section::PivotPoints, &opts).unwrap();
        assert!(pivots.contains("^GSPC pivot"));

        let indicators = analyzer.section(Section::TechnicalIndicators, &opts).unwrap();
        assert!(indicators.contains("SMA (200)"));

        assert!(analyzer.section(Section::VixRatioPlot, &opts).unwrap().contains("VIX vs VIX3M"));
        assert!(analyzer.section(Section::TaPlot, &opts).unwrap().contains("RSI (14)"));
    }

    #[test]
    fn test_failed_sections_do_not_stop_the_run() {
        colored::control::set_override(false);
        let config = AppConfig::default();
        let analyzer = Analyzer::new(FakeProvider, &config, today());
        let opts = RunOptions {
            core: false,
            reddit: true,
            news: true,
            plot_vix_ratio: true,
            ..options()
        };

        let mut out = Vec::new();
        let report = analyzer.run(&opts, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(report.exit_code(), 1);
        assert!(text.contains("Reddit Sentiment failed: Configuration error: reddit.client_id"));
        assert!(text.contains("News Sentiment failed: Configuration error: news.api_key"));
        assert!(text.contains("VIX3M / VIX ratio"));
    }

    #[test]
    fn test_bad_period_is_invalid_input() {
        let config = AppConfig::default();
        let analyzer = Analyzer::new(FakeProvider, &config, today());
        let opts = RunOptions {
            ta_period: "forever".into(),
            ..options()
        };
        assert!(matches!(
            analyzer.section(Section::TaPlot, &opts),
            Err(AnalyzerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_export_writes_files() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::default();
        let analyzer = Analyzer::new(FakeProvider, &config, today()).with_exporter(Exporter::new(dir.path()));

        let out = analyzer.section(Section::Ironfly, &options()).unwrap();
        assert!(out.contains("Exported:"));
        assert!(dir.path().join("ironfly_GSPC.json").exists());
        assert!(dir.path().join("ironfly_GSPC.csv").exists());
    }

    #[test]
    fn test_export_named_after_fallback_symbol() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.ironfly.fallback_symbol = "^GSPC".to_string();
        let analyzer = Analyzer::new(FakeProvider, &config, today()).with_exporter(Exporter::new(dir.path()));
        let opts = RunOptions {
            ticker: "QQQ".into(),
            ..options()
        };

        let out = analyzer.section(Section::Ironfly, &opts).unwrap();
        assert!(out.contains("Exported:"));
        assert!(dir.path().join("ironfly_GSPC.json").exists());
        assert!(!dir.path().join("ironfly_QQQ.json").exists());
    }

    #[test]
    fn test_news_query() {
        assert_eq!(news_query("$SPX.X"), "SPX");
        assert_eq!(news_query("^VIX"), "VIX");
        assert_eq!(news_query("AAPL"), "AAPL");
    }
}
