// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{
    Item, RawEntry, SourceProvider, Timestamp, DEFAULT_SOURCE_LABEL,
};
use chrono::{DateTime, FixedOffset, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on normalized text length (chars).
pub const MAX_TEXT_CHARS: usize = 1500;

/// Normalize text: decode entities, strip markup, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[a-z!][^>]*>").unwrap());
    out = RE_TAGS.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
    out = RE_WS.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}

/// Convert a provider record into an `Item`. Never fails: missing pieces degrade
/// to empty strings or an absent timestamp.
pub fn normalize_entry(raw: RawEntry, tz: &FixedOffset) -> Item {
    let source = raw
        .source
        .as_deref()
        .map(normalize_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SOURCE_LABEL.to_string());

    let published = raw
        .published
        .or(raw.updated)
        .map(|ts| to_zone(ts, tz));

    Item {
        source,
        url: raw.link.map(|l| l.trim().to_string()).unwrap_or_default(),
        title: raw.title.as_deref().map(normalize_text).unwrap_or_default(),
        summary: raw.summary.as_deref().map(normalize_text).unwrap_or_default(),
        published,
        origin_kind: raw.origin,
    }
}

pub fn normalize_all(raw: Vec<RawEntry>, tz: &FixedOffset) -> Vec<Item> {
    raw.into_iter().map(|r| normalize_entry(r, tz)).collect()
}

pub fn to_zone(ts: DateTime<Utc>, tz: &FixedOffset) -> Timestamp {
    ts.with_timezone(tz)
}

/// Result of one provider call, kept explicit so the caller decides how to log it.
#[derive(Debug)]
pub enum FetchOutcome {
    Items { provider: String, entries: Vec<RawEntry> },
    Failed { provider: String, reason: String },
}

impl FetchOutcome {
    pub fn provider(&self) -> &str {
        match self {
            FetchOutcome::Items { provider, .. } | FetchOutcome::Failed { provider, .. } => provider,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FetchOutcome::Failed { .. })
    }

    /// Entries contributed, with a failure counting as zero.
    pub fn into_entries(self) -> Vec<RawEntry> {
        match self {
            FetchOutcome::Items { entries, .. } => entries,
            FetchOutcome::Failed { .. } => Vec::new(),
        }
    }
}

/// Wrap a single fetch into an outcome, logging failures.
pub fn outcome_of(provider: &str, res: anyhow::Result<Vec<RawEntry>>) -> FetchOutcome {
    match res {
        Ok(entries) => {
            counter!("digest_items_fetched_total").increment(entries.len() as u64);
            tracing::debug!(target: "ingest", provider, count = entries.len(), "provider ok");
            FetchOutcome::Items {
                provider: provider.to_string(),
                entries,
            }
        }
        Err(e) => {
            tracing::warn!(target: "ingest", error = ?e, provider, "provider error");
            counter!("digest_source_errors_total").increment(1);
            FetchOutcome::Failed {
                provider: provider.to_string(),
                reason: format!("{e:#}"),
            }
        }
    }
}

/// Fetch every provider in order. A failing provider contributes nothing.
pub async fn collect(providers: &[Box<dyn SourceProvider>]) -> Vec<FetchOutcome> {
    let mut out = Vec::with_capacity(providers.len());
    for p in providers {
        out.push(outcome_of(p.name(), p.fetch_latest().await));
    }
    out
}

/// Fetch + normalize, returning items and the names of providers that failed.
pub async fn collect_items(
    providers: &[Box<dyn SourceProvider>],
    tz: &FixedOffset,
) -> (Vec<Item>, Vec<String>) {
    let mut items = Vec::new();
    let mut failed = Vec::new();
    for outcome in collect(providers).await {
        if outcome.is_failure() {
            failed.push(outcome.provider().to_string());
        }
        items.extend(normalize_all(outcome.into_entries(), tz));
    }
    (items, failed)
}
