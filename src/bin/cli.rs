//! Market Analyzer CLI
//!
//! Runs the core market report (ironfly, volatility indices, bond yields,
//! pivot points, technical indicators) plus any optional sections.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use market_analyzer::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "market-analyzer")]
#[command(version)]
#[command(about = "Market data report: ironfly strikes, indicators, volatility, yields and sentiment", long_about = None)]
struct Cli {
    /// Ticker to analyze; index aliases such as $SPX.X are accepted
    #[arg(short, long, default_value = "$SPX.X")]
    ticker: String,

    /// Ironfly wing width in strike points
    #[arg(short, long, default_value_t = 50.0)]
    wings: f64,

    /// Reddit sentiment for the configured subreddit
    #[arg(short, long)]
    reddit_analysis: bool,

    /// NewsAPI sentiment for the ticker
    #[arg(short, long)]
    news_analysis: bool,

    /// CNBC feed sentiment
    #[arg(short, long)]
    cnbc_analysis: bool,

    /// Latest business headlines
    #[arg(long)]
    top_headlines: bool,

    /// Restrict top headlines to one symbol
    #[arg(long, requires = "top_headlines")]
    symbol: Option<String>,

    /// Plot the VIX3M/VIX ratio
    #[arg(short, long)]
    plot_vix_ratio: bool,

    /// History period for the VIX ratio plot
    #[arg(long, default_value = "1y")]
    vix_period: String,

    /// Plot price, RSI and MACD for the ticker
    #[arg(long)]
    plot_ta: bool,

    /// History period for the technical analysis plot
    #[arg(long, default_value = "1y")]
    ta_period: String,

    /// Both plots
    #[arg(short = 'a', long)]
    plot_all: bool,

    /// Write results as JSON and CSV to the export directory
    #[arg(short, long)]
    export_data: bool,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,

    /// Config file (defaults to config/default.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the core sections and run only the optional ones
    #[arg(long)]
    skip_core: bool,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            ticker: self.ticker.clone(),
            wings: self.wings,
            core: !self.skip_core,
            reddit: self.reddit_analysis,
            news: self.news_analysis,
            cnbc: self.cnbc_analysis,
            top_headlines: self.top_headlines,
            headline_symbol: self.symbol.clone(),
            plot_vix_ratio: self.plot_vix_ratio || self.plot_all,
            vix_period: self.vix_period.clone(),
            plot_ta: self.plot_ta || self.plot_all,
            ta_period: self.ta_period.clone(),
            export: self.export_data,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path, true),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    let provider = CachedMarketData::new(YahooClient::new(&config.http)?);
    let options = cli.run_options();

    let mut analyzer = Analyzer::new(provider, &config, Local::now().date_naive());
    if options.export {
        analyzer = analyzer.with_exporter(Exporter::new(&config.export.dir));
    }

    let report = analyzer.run(&options, &mut io::stdout().lock())?;
    Ok(report.exit_code() as u8)
}

/// Logs go to stderr so they never mix with the report
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("warn,market_analyzer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
