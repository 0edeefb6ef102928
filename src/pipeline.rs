//! One digest run: sources in, rendered email out.
//!
//! `main` builds the providers from `SourcesConfig` and hands them here; tests
//! pass fixture providers and fakes through the same entry point.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::config::{DigestConfig, SourcesConfig};
use crate::ingest::collect_items;
use crate::ingest::providers::{FeedProvider, FinnhubClient, NewsApi};
use crate::ingest::types::{SourceProvider, Timestamp};
use crate::render::{period_label, render_email, Period};
use crate::select::{select, Fallbacks, Selection};
use crate::summarize::{summarize_sections, BriefSections, Summarizer};

pub const SEC_SOURCE_LABEL: &str = "SEC EDGAR";

/// Shared HTTP client for feeds and the news API.
pub fn http_client(sources: &SourcesConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(sources.user_agent.clone())
        .timeout(Duration::from_secs(sources.timeout_secs))
        .build()
        .context("building HTTP client")
}

/// Configured RSS feeds followed by the regulatory feed, in discovery order.
pub fn primary_providers(
    sources: &SourcesConfig,
    http: &reqwest::Client,
) -> Vec<Box<dyn SourceProvider>> {
    let mut out: Vec<Box<dyn SourceProvider>> = sources
        .rss
        .iter()
        .map(|f| Box::new(FeedProvider::from_url(&f.name, &f.url, http.clone())) as Box<dyn SourceProvider>)
        .collect();
    if let Some(url) = sources.sec.current_feed.as_deref() {
        out.push(Box::new(
            FeedProvider::from_url(SEC_SOURCE_LABEL, url, http.clone()).filings(),
        ));
    }
    out
}

/// Alternate feeds and the news API client (only when a key resolves).
pub fn fallback_sources(sources: &SourcesConfig, http: &reqwest::Client) -> Fallbacks {
    let feeds = |list: &[crate::config::FeedSpec]| {
        list.iter()
            .map(|f| Box::new(FeedProvider::from_url(&f.name, &f.url, http.clone())) as Box<dyn SourceProvider>)
            .collect::<Vec<_>>()
    };
    let news_api = sources.news_api.key().map(|key| {
        Box::new(FinnhubClient::new(http.clone(), &sources.news_api.base_url, &key)) as Box<dyn NewsApi>
    });
    if news_api.is_none() {
        info!(target: "select", "news API key not set; API fallback stages unavailable");
    }
    Fallbacks {
        markets_feeds: feeds(&sources.fallback.markets),
        companies_feeds: feeds(&sources.fallback.companies),
        news_api,
        tickers: sources.news_api.capped_tickers(),
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct Digest {
    pub selection: Selection,
    pub sections: BriefSections,
    pub period_label: String,
    pub subject: String,
    pub html: String,
}

pub async fn build_digest(
    cfg: &DigestConfig,
    primary: &[Box<dyn SourceProvider>],
    fallbacks: &Fallbacks,
    summarizer: &dyn Summarizer,
    period: Period,
    now: Timestamp,
) -> Digest {
    let tz = cfg.window.tz();
    let (items, failed) = collect_items(primary, &tz).await;
    info!(target: "ingest", items = items.len(), failed = failed.len(), "primary sources collected");

    let mut selection = select(cfg, items, fallbacks, now).await;
    // primary failures first, then whatever the fallback stages hit
    let mut all_failed = failed;
    all_failed.append(&mut selection.report.failed_sources);
    selection.report.failed_sources = all_failed;

    let sections = summarize_sections(summarizer, &selection.buckets).await;
    let label = period_label(period, now.date_naive());
    let (subject, html) = render_email(&sections, &label, &cfg.email.subject_prefix);

    Digest {
        selection,
        sections,
        period_label: label,
        subject,
        html,
    }
}
