// src/relevance.rs
//! Relevance gate: finance vocabulary scoring, keep/drop assessment, and the
//! three-way bucket classification (companies → macro → markets).
//!
//! Everything here is a pure function of the item text, its origin kind and
//! the filter configuration. Identical input always yields identical output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::config::FilterConfig;
use crate::ingest::types::{Item, OriginKind};
use crate::select::Bucket;

/* ----------------------------
Vocabulary
---------------------------- */

/// Multi-word and punctuated phrases: plain case-insensitive substring match.
const SUBSTRING_TERMS: &[&str] = &[
    // macro
    "federal reserve",
    "jobs report",
    "interest rate",
    "rate cut",
    "rate hike",
    "retail sales",
    "central bank",
    "consumer spending",
    "bureau of labor",
    "bureau of economic",
    // markets
    "wall street",
    "s&p 500",
    "dow jones",
    "oil prices",
    "sell-off",
    // corporate
    "quarterly results",
];

/// Single words and abbreviations as `(term, pattern)`: word-boundary match so
/// "rates" never fires inside "operates" and "sec" never inside "second".
const WORD_TERMS: &[(&str, &str)] = &[
    // macro
    ("inflation", "inflation"),
    ("payrolls", "payrolls?"),
    ("unemployment", "unemployment"),
    ("rates", "rates?"),
    ("yields", "yields?"),
    ("treasury", "treasury"),
    ("treasuries", "treasuries"),
    ("recession", "recessions?"),
    ("tariff", "tariffs?"),
    ("mortgage", "mortgages?"),
    ("bond", "bonds?"),
    ("fed", "fed"),
    ("fomc", "fomc"),
    ("cpi", "cpi"),
    ("ppi", "ppi"),
    ("pce", "pce"),
    ("gdp", "gdp"),
    ("bls", "bls"),
    ("bea", "bea"),
    // markets
    ("nasdaq", "nasdaq"),
    ("stocks", "stocks"),
    ("equities", "equities"),
    ("futures", "futures"),
    ("crude", "crude"),
    ("bitcoin", "bitcoin"),
    ("selloff", "selloffs?"),
    ("rally", "rall(?:y|ies|ied)"),
    ("investors", "investors?"),
    ("volatility", "volatility"),
    ("etf", "etfs?"),
    // corporate
    ("earnings", "earnings"),
    ("revenue", "revenues?"),
    ("dividend", "dividends?"),
    ("buyback", "buybacks?"),
    ("layoffs", "layoffs?"),
    ("acquisition", "acquisitions?"),
    ("merger", "mergers?"),
    ("guidance", "guidance"),
    ("profit", "profits?"),
    ("eps", "eps"),
    ("ipo", "ipos?"),
    ("m&a", "m&a"),
    ("sec", "sec"),
    ("10-k", "10-k"),
    ("10-q", "10-q"),
    ("8-k", "8-k"),
    ("s-1", "s-1"),
    ("spac", "spacs?"),
    ("spinoff", "spin-?offs?"),
];

struct CompiledTerm {
    term: &'static str,
    re: Option<Regex>,
}

static TERMS: Lazy<Vec<CompiledTerm>> = Lazy::new(|| {
    let mut out: Vec<CompiledTerm> = SUBSTRING_TERMS
        .iter()
        .map(|&term| CompiledTerm { term, re: None })
        .collect();
    out.extend(WORD_TERMS.iter().map(|&(term, pattern)| CompiledTerm {
        term,
        re: Some(Regex::new(&format!(r"(?i)\b(?:{})\b", pattern)).expect("word term regex")),
    }));
    out
});

/// Company-specific signals, checked against title + summary.
static COMPANY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(earnings|results|eps|revenues?|guidance|10-k|10-q|8-k|filings?|m&a|mergers?|acquisitions?|acquires?|acquired|buybacks?|share repurchase|dividends?|layoffs?|spin-?offs?|ipos?|sec)\b",
    )
    .expect("company regex")
});

/// Macro institutions and indicators, checked against source + title.
static MACRO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(fed|federal reserve|fomc|bls|bureau of labor|bea|bureau of economic|cpi|gdp|inflation|unemployment|payrolls?|jobs report|retail sales|ppi|pce|mortgages?|treasury|treasuries|bonds?|yields?)\b",
    )
    .expect("macro regex")
});

/* ----------------------------
Scoring
---------------------------- */

/// Score plus the distinct vocabulary terms that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relevance {
    pub score: u32,
    pub matched: Vec<&'static str>,
}

/// Count distinct vocabulary terms present in `text`.
pub fn score_text(text: &str) -> Relevance {
    let lower = text.to_lowercase();
    let matched: Vec<&'static str> = TERMS
        .iter()
        .filter(|t| match &t.re {
            Some(re) => re.is_match(text),
            None => lower.contains(t.term),
        })
        .map(|t| t.term)
        .collect();
    Relevance {
        score: matched.len() as u32,
        matched,
    }
}

/// Finance relevance of an item: distinct term matches in title + summary.
pub fn relevance(item: &Item) -> u32 {
    score_text(&item.text()).score
}

/* ----------------------------
Keep / drop
---------------------------- */

/// Why an item was kept or dropped by the relevance gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Score reached the threshold.
    Relevant { score: u32 },
    /// Regulatory filings pass regardless of wording.
    Filing,
    SourceNotAllowed,
    NegativeTerm(String),
    DropPath(String),
    BelowThreshold { score: u32 },
}

impl Verdict {
    pub fn is_relevant(&self) -> bool {
        matches!(self, Verdict::Relevant { .. } | Verdict::Filing)
    }
}

pub fn source_allowed(source: &str, allowed: &[String]) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a.eq_ignore_ascii_case(source.trim()))
}

fn url_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(u) => u.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    }
}

/// Full gate decision for `item` at threshold `min_relevance`.
pub fn assess(item: &Item, filters: &FilterConfig, min_relevance: u32) -> Verdict {
    // 1) allow-list
    if !source_allowed(&item.source, &filters.allowed_sources) {
        return Verdict::SourceNotAllowed;
    }

    if item.origin_kind == OriginKind::Filing {
        return Verdict::Filing;
    }

    // 2) clearly financial
    let text = item.text();
    let rel = score_text(&text);
    if rel.score >= min_relevance {
        return Verdict::Relevant { score: rel.score };
    }

    // 3) geopolitical / conflict markers
    let lower = text.to_lowercase();
    if let Some(t) = filters
        .negative_terms
        .iter()
        .find(|t| lower.contains(&t.to_lowercase()))
    {
        return Verdict::NegativeTerm(t.clone());
    }

    // 4) section paths we don't trust unless the text is strongly financial
    let path = url_path(&item.url);
    let strong = 3u32.max(min_relevance + 1);
    if let Some(tok) = filters
        .drop_if_url_path_contains
        .iter()
        .find(|tok| path.contains(&tok.to_lowercase()))
    {
        if rel.score < strong {
            return Verdict::DropPath(tok.clone());
        }
    }

    // 5) ambiguous and unscored
    Verdict::BelowThreshold { score: rel.score }
}

pub fn is_story_relevant(item: &Item, filters: &FilterConfig, min_relevance: u32) -> bool {
    assess(item, filters, min_relevance).is_relevant()
}

/* ----------------------------
Classification
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Macro,
    Markets,
    Companies,
    Drop,
}

impl Classification {
    pub fn bucket(self) -> Option<Bucket> {
        match self {
            Classification::Macro => Some(Bucket::Macro),
            Classification::Markets => Some(Bucket::Markets),
            Classification::Companies => Some(Bucket::Companies),
            Classification::Drop => None,
        }
    }
}

/// Filing origin, or wording that names a company event.
pub fn looks_company_specific(item: &Item) -> bool {
    item.origin_kind == OriginKind::Filing || COMPANY_RE.is_match(&item.text())
}

pub fn looks_macro(item: &Item) -> bool {
    MACRO_RE.is_match(&format!("{} {}", item.source, item.title))
}

/// relevance gate → company check → macro check → markets default.
pub fn classify(item: &Item, filters: &FilterConfig, min_relevance: u32) -> Classification {
    let verdict = assess(item, filters, min_relevance);
    let class = if !verdict.is_relevant() {
        Classification::Drop
    } else if looks_company_specific(item) {
        Classification::Companies
    } else if looks_macro(item) {
        Classification::Macro
    } else {
        Classification::Markets
    };
    log_decision(item, &verdict, class, min_relevance);
    class
}

/* ----------------------------
Diagnostics
---------------------------- */

pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

// Never log raw text. Only hashed id + short lists.
fn log_decision(item: &Item, verdict: &Verdict, class: Classification, threshold: u32) {
    if !tracing::enabled!(target: "relevance", tracing::Level::DEBUG) {
        return;
    }
    let text = item.text();
    let rel = score_text(&text);
    let matched: Vec<&str> = rel.matched.iter().take(5).copied().collect();
    debug!(
        target: "relevance",
        id = %anon_hash(&text),
        score = rel.score,
        threshold,
        verdict = ?verdict,
        class = ?class,
        matched = ?matched,
        "classified"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, summary: &str) -> Item {
        Item {
            source: "Wire".into(),
            url: "https://example.com/business/a".into(),
            title: title.into(),
            summary: summary.into(),
            published: None,
            origin_kind: OriginKind::News,
        }
    }

    #[test]
    fn short_terms_need_word_boundaries() {
        // "second", "fedex" and "happiness" must not trip sec/fed/ppi
        let r = score_text("A second FedEx truck brings happiness");
        assert_eq!(r.score, 0, "{:?}", r.matched);
        let r = score_text("SEC questions IPO; Fed silent");
        assert!(r.matched.contains(&"sec"));
        assert!(r.matched.contains(&"ipo"));
        assert!(r.matched.contains(&"fed"));
    }

    #[test]
    fn single_words_do_not_fire_inside_other_words() {
        let r = score_text("Tech firm operates new data center as investors cheer");
        assert_eq!(r.matched, vec!["investors"]);
        for text in [
            "Plant generates power",
            "Growth accelerates and moderates",
            "Vagabond crew generally agrees on learnings",
        ] {
            let r = score_text(text);
            assert_eq!(r.score, 0, "{text}: {:?}", r.matched);
        }
        let r = score_text("Fed holds rates steady, signals cuts ahead");
        assert_eq!(r.score, 2, "{:?}", r.matched);
        assert!(r.matched.contains(&"rates"));
        let r = score_text("Bonds rallied as yield curve steepened");
        assert_eq!(r.matched, vec!["yields", "bond", "rally"]);
    }

    #[test]
    fn distinct_terms_are_counted_once() {
        assert_eq!(score_text("inflation inflation INFLATION").score, 1);
    }

    #[test]
    fn allow_list_is_case_insensitive() {
        let allowed = vec!["Reuters".to_string()];
        assert!(source_allowed("reuters", &allowed));
        assert!(!source_allowed("Blog", &allowed));
        assert!(source_allowed("anything", &[]));
    }

    #[test]
    fn drop_path_needs_strong_score_to_survive() {
        let filters = FilterConfig {
            min_relevance: 5,
            drop_if_url_path_contains: vec!["/world/".into()],
            ..FilterConfig::default()
        };
        let mut it = item("Stocks rally on Wall Street", "");
        it.url = "https://example.com/world/stocks".into();
        assert_eq!(
            assess(&it, &filters, 5),
            Verdict::DropPath("/world/".into())
        );
    }

    #[test]
    fn anon_hash_is_short_and_stable() {
        let a = anon_hash("Fed holds");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_hash("Fed holds"));
    }
}
