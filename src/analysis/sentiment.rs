//! Sentiment scoring and ticker-mention aggregation
//!
//! The scorer is a lexicon-and-rules polarity model in the VADER family:
//! word valences, boosters and dampeners, negation, ALL-CAPS emphasis, a
//! contrastive "but" and exclamation emphasis, normalised to a compound
//! score in [-1, 1] plus neg/neu/pos proportions.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{NewsHeadline, Post};

/// Symbols reported per aggregation
pub const TOP_SYMBOLS: usize = 20;

const BOOSTER_INCREMENT: f64 = 0.293;
const CAPS_INCREMENT: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Polarity of one text
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    /// Normalised sum of valences in [-1, 1]
    pub compound: f64,
}

/// Mentions and mean sentiment for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub symbol: String,
    pub mention_count: usize,
    /// Mean compound score over the mentioning posts
    pub aggregate_sentiment_score: f64,
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    /// Filled in by the caller when a quote is available
    #[serde(default)]
    pub last_price: Option<f64>,
}

/// A headline with its polarity, flat for tabular export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHeadline {
    pub title: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub url: String,
    pub compound: f64,
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
}

/// Lexicon-based polarity scorer
pub struct SentimentAnalyzer {
    lexicon: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
    negations: HashSet<&'static str>,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

struct Token {
    lower: String,
    is_upper: bool,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            lexicon: Self::build_lexicon(),
            boosters: Self::build_boosters(),
            negations: Self::build_negations(),
        }
    }

    /// Score a text. Empty text scores all zeros.
    pub fn polarity_scores(&self, text: &str) -> SentimentScores {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return SentimentScores::default();
        }

        // Caps only count as emphasis when the text is not shouting throughout
        let caps_differ = tokens.iter().any(|t| t.is_upper) && tokens.iter().any(|t| !t.is_upper);

        let mut sentiments: Vec<f64> = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| self.token_valence(&tokens, i, token, caps_differ))
            .collect();

        if let Some(but) = tokens.iter().position(|t| t.lower == "but") {
            for (i, s) in sentiments.iter_mut().enumerate() {
                if i < but {
                    *s *= 0.5;
                } else if i > but {
                    *s *= 1.5;
                }
            }
        }

        let emphasis = punctuation_emphasis(text);
        let sum: f64 = sentiments.iter().sum();
        let compound = if sum > 0.0 {
            normalize(sum + emphasis)
        } else if sum < 0.0 {
            normalize(sum - emphasis)
        } else {
            0.0
        };

        let mut pos_sum = 0.0;
        let mut neg_sum = 0.0;
        let mut neu_count = 0.0;
        for &s in &sentiments {
            if s > 0.0 {
                pos_sum += s + 1.0;
            } else if s < 0.0 {
                neg_sum += s - 1.0;
            } else {
                neu_count += 1.0;
            }
        }
        if pos_sum > neg_sum.abs() {
            pos_sum += emphasis;
        } else if pos_sum < neg_sum.abs() {
            neg_sum -= emphasis;
        }

        let total = pos_sum + neg_sum.abs() + neu_count;
        SentimentScores {
            neg: (neg_sum / total).abs(),
            neu: neu_count / total,
            pos: pos_sum / total,
            compound,
        }
    }

    fn token_valence(&self, tokens: &[Token], i: usize, token: &Token, caps_differ: bool) -> f64 {
        if self.boosters.contains_key(token.lower.as_str()) {
            return 0.0;
        }
        let Some(&base) = self.lexicon.get(token.lower.as_str()) else {
            return 0.0;
        };

        let mut valence = base;
        if caps_differ && token.is_upper {
            valence += base.signum() * CAPS_INCREMENT;
        }

        for (back, damping) in [(1, 1.0), (2, 0.95), (3, 0.9)] {
            let Some(prior) = i.checked_sub(back).and_then(|j| tokens.get(j)) else {
                break;
            };
            if let Some(&scalar) = self.boosters.get(prior.lower.as_str()) {
                let mut scalar = scalar * valence.signum();
                if caps_differ && prior.is_upper {
                    scalar += CAPS_INCREMENT * valence.signum();
                }
                valence += scalar * damping;
            }
            if self.is_negation(&prior.lower) {
                valence *= NEGATION_SCALAR;
            }
        }

        valence
    }

    fn is_negation(&self, word: &str) -> bool {
        self.negations.contains(word) || word.ends_with("n't")
    }

    /// Score each headline on its title plus description
    pub fn score_headlines(&self, headlines: &[NewsHeadline]) -> Vec<ScoredHeadline> {
        headlines
            .iter()
            .map(|h| {
                let scores = self.polarity_scores(&h.scoring_text());
                ScoredHeadline {
                    title: h.title.clone(),
                    source: h.source.clone(),
                    published_at: h.published_at,
                    url: h.url.clone(),
                    compound: scores.compound,
                    neg: scores.neg,
                    neu: scores.neu,
                    pos: scores.pos,
                }
            })
            .collect()
    }

    /// Mentions and mean sentiment per vocabulary symbol, ranked by
    /// mention count (ties by symbol), top [`TOP_SYMBOLS`].
    ///
    /// Matching is case-insensitive on whole words, a leading `$` is
    /// allowed, and a post counts at most once per symbol.
    pub fn aggregate<I, S>(&self, posts: &[Post], vocabulary: I) -> Vec<SentimentRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vocabulary: BTreeSet<String> = vocabulary
            .into_iter()
            .map(|s| s.as_ref().trim_start_matches('$').to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        let mut totals: HashMap<&str, (usize, SentimentScores)> = HashMap::new();
        for post in posts {
            let words = word_set(&post.text);
            let mentioned: Vec<&str> = vocabulary
                .iter()
                .map(String::as_str)
                .filter(|s| words.contains(*s))
                .collect();
            if mentioned.is_empty() {
                continue;
            }

            let scores = self.polarity_scores(&post.text);
            for symbol in mentioned {
                let entry = totals.entry(symbol).or_default();
                entry.0 += 1;
                entry.1.neg += scores.neg;
                entry.1.neu += scores.neu;
                entry.1.pos += scores.pos;
                entry.1.compound += scores.compound;
            }
        }

        let mut records: Vec<SentimentRecord> = totals
            .into_iter()
            .map(|(symbol, (count, sums))| {
                let n = count as f64;
                SentimentRecord {
                    symbol: symbol.to_string(),
                    mention_count: count,
                    aggregate_sentiment_score: sums.compound / n,
                    neg: sums.neg / n,
                    neu: sums.neu / n,
                    pos: sums.pos / n,
                    last_price: None,
                }
            })
            .collect();

        records.sort_by(|a, b| {
            b.mention_count
                .cmp(&a.mention_count)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        records.truncate(TOP_SYMBOLS);
        records
    }

    fn build_lexicon() -> HashMap<&'static str, f64> {
        [
            // Positive
            ("good", 1.9), ("great", 3.1), ("excellent", 2.7), ("amazing", 2.8),
            ("awesome", 3.1), ("love", 3.2), ("loving", 2.9), ("nice", 1.8),
            ("best", 3.2), ("better", 1.9), ("win", 2.8), ("wins", 2.7),
            ("winning", 2.4), ("won", 2.7), ("winner", 2.8), ("gain", 2.4),
            ("gains", 1.8), ("gained", 1.6), ("profit", 1.9), ("profits", 1.9),
            ("profitable", 1.9), ("bullish", 2.0), ("bull", 1.2), ("rally", 1.8),
            ("rallies", 1.8), ("rallied", 1.8), ("surge", 1.6), ("surges", 1.6),
            ("surged", 1.6), ("soar", 2.0), ("soars", 2.0), ("soared", 2.0),
            ("strong", 2.3), ("stronger", 2.1), ("strength", 2.2), ("beat", 1.2),
            ("beats", 1.5), ("happy", 2.7), ("glad", 2.0), ("optimistic", 2.3),
            ("optimism", 2.5), ("confident", 2.2), ("growth", 1.6), ("growing", 1.5),
            ("moon", 1.8), ("mooning", 2.2), ("tendies", 2.0), ("rocket", 1.5),
            ("upgrade", 1.6), ("upgraded", 1.6), ("recover", 1.5), ("recovery", 1.4),
            ("rebound", 1.3), ("boost", 1.7), ("boosts", 1.7), ("outperform", 1.8),
            ("safe", 1.9), ("success", 2.7), ("successful", 2.8), ("opportunity", 1.8),
            ("positive", 2.6), ("wow", 2.8), ("yes", 1.7), ("record", 0.9),
            ("upside", 1.5), ("cheap", 0.8), ("undervalued", 1.4), ("buy", 0.9),
            ("lol", 1.8), ("haha", 2.0), ("thanks", 1.9), ("helpful", 1.8),
            ("benefit", 2.0), ("improve", 1.9), ("improved", 2.1), ("improving", 1.8),
            ("exciting", 2.2), ("excited", 1.4), ("hope", 1.9), ("hopeful", 2.3),
            ("pleased", 1.9), ("solid", 1.8), ("robust", 1.6), ("easy", 1.9),
            // Negative
            ("bad", -2.5), ("terrible", -2.1), ("awful", -2.0), ("worst", -3.1),
            ("worse", -2.1), ("hate", -2.7), ("loss", -1.3), ("losses", -1.7),
            ("lose", -1.7), ("losing", -1.6), ("lost", -1.3), ("crash", -1.7),
            ("crashed", -1.8), ("crashing", -1.9), ("plunge", -2.0), ("plunges", -2.0),
            ("plunged", -2.0), ("drop", -1.1), ("drops", -1.1), ("dropped", -1.1),
            ("fall", -1.0), ("falls", -1.0), ("fell", -1.0), ("decline", -1.4),
            ("declines", -1.4), ("weak", -1.9), ("weaker", -1.9), ("weakness", -1.6),
            ("bearish", -1.8), ("bear", -1.0), ("fear", -2.2), ("fears", -2.0),
            ("panic", -2.3), ("risk", -1.1), ("risky", -1.4), ("recession", -2.0),
            ("dump", -1.6), ("dumped", -1.7), ("dumping", -1.6), ("fraud", -2.8),
            ("scam", -2.7), ("bankrupt", -2.6), ("bankruptcy", -2.6), ("worry", -1.9),
            ("worried", -1.2), ("concern", -1.2), ("concerns", -1.2), ("miss", -0.6),
            ("missed", -1.2), ("downgrade", -1.5), ("downgraded", -1.5), ("sad", -2.1),
            ("angry", -2.3), ("poor", -2.1), ("fail", -2.5), ("failed", -2.3),
            ("failure", -2.3), ("disappointing", -2.2), ("disappointed", -1.9),
            ("problem", -1.7), ("problems", -1.7), ("trouble", -1.7), ("uncertainty", -1.4),
            ("slump", -1.9), ("tumble", -1.6), ("tumbles", -1.6), ("sink", -1.1),
            ("sinks", -1.1), ("cut", -1.1), ("cuts", -1.1), ("layoffs", -1.6),
            ("bagholder", -1.5), ("bagholders", -1.5), ("rekt", -2.0), ("sucks", -1.5),
            ("stupid", -2.4), ("dead", -3.3), ("kill", -3.7), ("killed", -3.5),
            ("ugly", -2.3), ("overvalued", -1.4), ("sell", -0.7), ("selloff", -1.6),
            ("volatile", -0.8), ("debt", -1.5), ("default", -1.3), ("lawsuit", -1.6),
            ("no", -1.2), ("down", -0.5),
        ]
        .into_iter()
        .collect()
    }

    fn build_boosters() -> HashMap<&'static str, f64> {
        let increase = [
            "absolutely", "completely", "extremely", "hugely", "incredibly", "really",
            "so", "super", "totally", "very", "highly", "most", "more", "insanely",
            "massively", "seriously",
        ];
        let decrease = ["barely", "hardly", "kinda", "slightly", "somewhat", "marginally", "less"];

        increase
            .into_iter()
            .map(|w| (w, BOOSTER_INCREMENT))
            .chain(decrease.into_iter().map(|w| (w, -BOOSTER_INCREMENT)))
            .collect()
    }

    fn build_negations() -> HashSet<&'static str> {
        [
            "not", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere",
            "cannot", "without", "dont", "cant", "wont", "isnt", "aint", "doesnt",
            "didnt", "wasnt", "arent", "shouldnt", "wouldnt", "couldnt", "hasnt", "havent",
        ]
        .into_iter()
        .collect()
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| w.chars().count() > 1)
        .map(|w| Token {
            lower: w.to_lowercase(),
            is_upper: w.chars().any(char::is_alphabetic)
                && w.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase),
        })
        .collect()
}

/// Uppercased alphanumeric words of a text
fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_uppercase)
        .collect()
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(4) as f64;
    let questions = text.matches('?').count();
    let question_emphasis = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * 0.18,
        _ => 0.96,
    };
    exclamations * EXCLAMATION_INCREMENT + question_emphasis
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

/// Score posts against a vocabulary with the default analyzer
pub fn aggregate_sentiment<I, S>(posts: &[Post], vocabulary: I) -> Vec<SentimentRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    SentimentAnalyzer::new().aggregate(posts, vocabulary)
}

/// Candidate ticker symbols in a batch of posts: 2 to 4 capital letters as
/// a whole word, optionally `$`-prefixed, minus `stopwords`.
pub fn extract_candidate_symbols(posts: &[Post], stopwords: &[&str]) -> BTreeSet<String> {
    let stop: HashSet<&str> = stopwords.iter().copied().collect();
    let Ok(pattern) = Regex::new(r"(?:^|[^A-Za-z0-9$])\$?([A-Z]{2,4})\b") else {
        return BTreeSet::new();
    };

    posts
        .iter()
        .flat_map(|post| {
            pattern
                .captures_iter(&post.text)
                .map(|c| c[1].to_string())
                .collect::<Vec<_>>()
        })
        .filter(|s| !stop.contains(s.as_str()))
        .collect()
}

/// Mean compound score of a set of headlines
pub fn mean_compound(headlines: &[ScoredHeadline]) -> Option<f64> {
    if headlines.is_empty() {
        return None;
    }
    Some(headlines.iter().map(|h| h.compound).sum::<f64>() / headlines.len() as f64)
}

/// Capitalised words that look like tickers on forums but are not
pub const STOPWORDS: &[&str] = &[
    "ABLE", "AH", "AI", "AINT", "ALEX", "ALL", "ALLS", "AM", "AMES", "AN", "AND", "ANDS", "AOC",
    "APE", "APER", "APES", "ARE", "ARK", "AS", "ASS", "AT", "ATED", "ATH", "ATM", "AUSE",
    "AVIN", "BABY", "BACK", "BAN", "BBB", "BE", "BEEN", "BEST", "BIG", "BLS", "BOYS", "BS",
    "BUT", "BUY", "BUYS", "BY", "CAD", "CAN", "CANT", "CAP", "CASH", "CCP", "CEO", "CFO",
    "CISE", "CKED", "CKET", "CKIN", "CNBC", "CNN", "COCK", "COME", "CPI", "CUM", "DA", "DATA",
    "DAY", "DD", "DFV", "DID", "DIES", "DING", "DIP", "DIPS", "DJI", "DMV", "DO", "DONT",
    "DOOM", "DOWN", "DTCC", "DTE", "DVF", "EACH", "EADY", "EASE", "EGME", "EIP", "EOD", "EOM",
    "EOW", "ER", "ETC", "ETF", "EU", "EV", "EVER", "FBI", "FD", "FED", "FIRE", "FMR", "FOMC",
    "FOMO", "FOR", "FORE", "FPS", "FREE", "FROM", "FTD", "FUCK", "FUD", "FUK", "GAIN", "GANG",
    "GAS", "GDP", "GET", "GING", "GIVE", "GO", "GOD", "GOOD", "GOT", "GUAM", "GUST", "GUYS",
    "HAND", "HANG", "HANK", "HAS", "HAVE", "HE", "HEAD", "HEIR", "HERE", "HERS", "HES", "HF",
    "HIGH", "HING", "HINK", "HIS", "HLDG", "HODL", "HOLD", "HOLY", "HORT", "HOW", "HSA", "IF",
    "IGHT", "IKES", "IM", "IMIT", "IN", "INGS", "INTO", "IPO", "IRA", "IRAN", "IRS", "IS", "IT",
    "ITED", "ITM", "ITS", "IV", "IVY", "JPOW", "JUST", "KEEP", "KING", "KNOW", "LAST", "LEFT",
    "LET", "LETS", "LFG", "LICK", "LIFT", "LIKE", "LING", "LION", "LLED", "LMAO", "LOL", "LONG",
    "LOVE", "LSD", "LVIN", "MACD", "MADE", "MAKE", "MANY", "MBS", "ME", "MEGA", "MENT", "MF",
    "MING", "MLK", "MM", "MOLE", "MOLY", "MOND", "MOON", "MORE", "MOVE", "MY", "NEED", "NFL",
    "NFT", "NGER", "NING", "NJ", "NLP", "NO", "NOT", "NOW", "NUAL", "NUVO", "NYSE", "OASS",
    "OCKS", "ODAY", "ODER", "ODOR", "OF", "OFF", "OG", "OH", "OHEN", "OING", "OK", "OLD", "OMG",
    "ON", "ONE", "ONLY", "OOGL", "OOOO", "OP", "OPEN", "OR", "ORTS", "OS", "OTC", "OTM", "OULD",
    "OUR", "OUT", "OVER", "OWED", "PC", "PCE", "PE", "PFOF", "PLR", "PM", "PMI", "POOP", "PPI",
    "PR", "PTSD", "QNX", "RAIN", "RDAY", "RE", "READ", "RED", "RENT", "RH", "RICE", "RIES",
    "RINK", "RIP", "RKET", "RMAN", "RONG", "RONK", "ROPE", "RTED", "RULE", "RYAN", "SAID",
    "SALE", "SAME", "SAYS", "SDAQ", "SEC", "SEE", "SELL", "SHIT", "SNL", "SOLD", "SPDR", "SPX",
    "SSR", "STAR", "STAY", "STOP", "TA", "TACO", "TAKE", "TANT", "TARD", "TD", "THAN", "THAT",
    "THE", "THEM", "THER", "THEY", "THIS", "TILL", "TIME", "TING", "TION", "TITS", "TLDR", "TO",
    "TOCK", "TONK", "TREK", "TUFF", "TV", "UGHT", "UI", "UK", "UN", "UP", "US", "USA", "USD",
    "USE", "VERY", "VIA", "VIX", "VLAD", "VOTE", "VP", "VW", "VWAP", "WAIT", "WANT", "WARS",
    "WAS", "WAY", "WE", "WEED", "WERE", "WFP", "WHAT", "WHEN", "WHO", "WHY", "WILL", "WITH",
    "WSB", "WTF", "XO", "XYZ", "YES", "YING", "YOLO", "YOU", "YOUR", "YTD", "ZERO",
];
