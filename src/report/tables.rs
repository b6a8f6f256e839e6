//! Terminal tables
//!
//! Each function renders one section to a string; the caller prints it.

use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::analysis::{
    IndicatorSet, IronflyResult, PivotPoints, ScoredHeadline, SentimentRecord, VolatilitySnapshot,
};
use crate::core::{NewsHeadline, Topic, YieldPoint};

use super::export::indicator_metrics;

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return "(no results)".to_string();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Bold section title
pub fn section_header(title: &str) -> String {
    title.bold().cyan().to_string()
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn optional(value: Option<f64>) -> String {
    value.map(money).unwrap_or_else(|| "-".to_string())
}

#[derive(Tabled)]
struct IronflyLeg {
    #[tabled(rename = "Action")]
    action: &'static str,
    #[tabled(rename = "Leg")]
    leg: &'static str,
    #[tabled(rename = "Strike")]
    strike: String,
    #[tabled(rename = "Quote")]
    quote: String,
}

pub fn ironfly_table(result: &IronflyResult) -> String {
    let legs = [
        IronflyLeg {
            action: "Buy",
            leg: "put (ask)",
            strike: money(result.lower_wing_strike),
            quote: money(result.lower_put_ask),
        },
        IronflyLeg {
            action: "Sell",
            leg: "put (bid)",
            strike: money(result.atm_strike),
            quote: money(result.atm_put_bid),
        },
        IronflyLeg {
            action: "Sell",
            leg: "call (bid)",
            strike: money(result.atm_strike),
            quote: money(result.atm_call_bid),
        },
        IronflyLeg {
            action: "Buy",
            leg: "call (ask)",
            strike: money(result.upper_wing_strike),
            quote: money(result.upper_call_ask),
        },
    ];

    let kind = if result.is_credit() { "credit" } else { "debit" };
    let mut out = format!("{} expiring {}", result.symbol, result.expiry);
    if result.used_fallback {
        out.push_str(&format!(" {}", "(fallback instrument)".yellow()));
    }
    out.push('\n');
    out.push_str(&render(&legs));
    out.push_str(&format!(
        "\nIronfly price: {} {}",
        format!("${:.2}", result.net_price).bold().green(),
        kind
    ));
    out
}

#[derive(Tabled)]
struct VolatilityRow {
    #[tabled(rename = "Indicator")]
    name: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "52-Week Range")]
    range: String,
    #[tabled(rename = "Range %")]
    position: String,
}

pub fn volatility_table(snapshots: &[VolatilitySnapshot]) -> String {
    let rows: Vec<VolatilityRow> = snapshots
        .iter()
        .map(|s| VolatilityRow {
            name: s.name.clone(),
            price: money(s.price),
            range: format!("{} - {}", optional(s.low_52w), optional(s.high_52w)),
            position: s
                .range_position()
                .map(|p| format!("{:.0}%", p * 100.0))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct BondRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Security Type")]
    security_type: String,
    #[tabled(rename = "Security Desc")]
    security_desc: String,
    #[tabled(rename = "Rate")]
    rate: String,
}

pub fn bond_table(points: &[YieldPoint]) -> String {
    let rows: Vec<BondRow> = points
        .iter()
        .map(|p| BondRow {
            date: p.record_date.to_string(),
            security_type: p.security_type.clone(),
            security_desc: p.security_desc.clone(),
            rate: format!("{:.3}%", p.rate),
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct PivotRow {
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Resistance")]
    resistance: String,
    #[tabled(rename = "Support")]
    support: String,
}

pub fn pivot_table(symbol: &str, pivots: &PivotPoints) -> String {
    let rows: Vec<PivotRow> = pivots
        .levels()
        .iter()
        .map(|&(level, r, s)| PivotRow {
            level: format!("R{level} / S{level}"),
            resistance: money(r),
            support: money(s),
        })
        .collect();
    format!("{symbol} pivot {}\n{}", money(pivots.pivot).bold(), render(&rows))
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Indicator")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn indicator_table(symbol: &str, set: &IndicatorSet) -> String {
    let rows: Vec<MetricRow> = indicator_metrics(set)
        .into_iter()
        .map(|m| MetricRow {
            name: m.metric,
            value: money(m.value),
        })
        .collect();
    format!("Technical indicators for {symbol}\n{}", render(&rows))
}

#[derive(Tabled)]
struct SentimentRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Mentions")]
    mentions: usize,
    #[tabled(rename = "Neg")]
    neg: String,
    #[tabled(rename = "Neu")]
    neu: String,
    #[tabled(rename = "Pos")]
    pos: String,
    #[tabled(rename = "Compound")]
    compound: String,
    #[tabled(rename = "Last Price")]
    last_price: String,
}

pub fn sentiment_table(records: &[SentimentRecord]) -> String {
    let rows: Vec<SentimentRow> = records
        .iter()
        .map(|r| SentimentRow {
            symbol: r.symbol.clone(),
            mentions: r.mention_count,
            neg: money(r.neg),
            neu: money(r.neu),
            pos: money(r.pos),
            compound: money(r.aggregate_sentiment_score),
            last_price: optional(r.last_price),
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct HeadlineRow {
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Neg")]
    neg: String,
    #[tabled(rename = "Neu")]
    neu: String,
    #[tabled(rename = "Pos")]
    pos: String,
    #[tabled(rename = "Compound")]
    compound: String,
}

const TITLE_WIDTH: usize = 70;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{cut}...")
}

pub fn headline_table(headlines: &[ScoredHeadline]) -> String {
    let rows: Vec<HeadlineRow> = headlines
        .iter()
        .map(|h| HeadlineRow {
            title: truncate(&h.title, TITLE_WIDTH),
            neg: money(h.neg),
            neu: money(h.neu),
            pos: money(h.pos),
            compound: money(h.compound),
        })
        .collect();
    render(&rows)
}

/// Legend printed under sentiment tables
pub fn sentiment_legend() -> String {
    [
        "Neg/Neu/Pos: share of negative, neutral and positive wording (0 to 1)",
        "Compound: normalised overall polarity (-1 most negative, 1 most positive)",
    ]
    .join("\n")
}

/// Numbered list of hot topics
pub fn topic_list(topics: &[Topic]) -> String {
    topics
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{:>2}. {}\n    {}", i + 1, t.title, t.url.dimmed()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered headline list with source and publish time
pub fn headline_list(headlines: &[NewsHeadline]) -> String {
    headlines
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let published = h
                .published_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            format!(
                "{:>2}. {}\n    {} {} {}",
                i + 1,
                h.title.bold(),
                h.source,
                published,
                h.url.dimmed()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
