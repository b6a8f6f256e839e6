//! Top headlines
//!
//! Prints the latest US business headlines from NewsAPI, or the most
//! relevant recent articles for one symbol, with their sentiment scores.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use market_analyzer::prelude::*;
use market_analyzer::report::{headline_list, headline_table, section_header};

#[derive(Parser, Debug)]
#[command(name = "headlines")]
#[command(version)]
#[command(about = "Latest business headlines with sentiment", long_about = None)]
struct Args {
    /// Only articles mentioning this symbol
    #[arg(short, long)]
    symbol: Option<String>,

    /// Config file (defaults to config/default.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("warn,market_analyzer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path, true),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    let client = NewsClient::new(&config.news, &config.http)?;
    let (title, headlines) = match args.symbol.as_deref() {
        Some(symbol) => (
            format!("Headlines for {symbol}"),
            client.search(symbol, Local::now().date_naive())?,
        ),
        None => ("Top Headlines".to_string(), client.top_headlines()?),
    };

    println!("{}", section_header(&title));
    if headlines.is_empty() {
        println!("(no results)");
        return Ok(());
    }
    println!("{}\n", headline_list(&headlines));
    println!("{}", headline_table(&SentimentAnalyzer::new().score_headlines(&headlines)));
    Ok(())
}
