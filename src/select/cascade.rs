// src/select/cascade.rs
//! Cascade orchestrator: strict → company backfill → relaxed → alternate
//! sources → news API → non-empty guarantee. Fallback sources are fetched
//! lazily, only when a bucket is still short after the earlier stages.

use chrono::{Duration, FixedOffset};
use metrics::counter;
use tracing::info;

use super::{
    company_backfill, ensure_non_empty, fill_from_pool, relaxed_pass, strict_pass, Bucket,
    BucketState, Buckets, StageCtx,
};
use crate::config::{DigestConfig, MAX_WINDOW_DAYS};
use crate::dedup::rank_and_dedupe;
use crate::ingest::providers::NewsApi;
use crate::ingest::types::{Item, RawEntry, SourceProvider, Timestamp};
use crate::ingest::{collect, normalize_all, outcome_of};
use crate::recency::{filter_recent, within_window};
use crate::relevance::looks_company_specific;

/// Primary pool fallback size, in multiples of the quota.
pub const PRIMARY_FALLBACK_FACTOR: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Strict,
    CompanyBackfill,
    Relaxed,
    AlternateSources,
    NewsApi,
    Placeholder,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Strict => "strict",
            Stage::CompanyBackfill => "company_backfill",
            Stage::Relaxed => "relaxed",
            Stage::AlternateSources => "alternate_sources",
            Stage::NewsApi => "news_api",
            Stage::Placeholder => "placeholder",
        }
    }
}

/// Secondary sources consulted only by the later stages. Empty by default.
#[derive(Default)]
pub struct Fallbacks {
    pub markets_feeds: Vec<Box<dyn SourceProvider>>,
    pub companies_feeds: Vec<Box<dyn SourceProvider>>,
    pub news_api: Option<Box<dyn NewsApi>>,
    /// Symbols for per-ticker queries, already capped for this run.
    pub tickers: Vec<String>,
}

/// What each stage contributed, for logs and tests.
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    pub added: Vec<(Stage, Bucket, usize)>,
    pub recency_relaxed: bool,
    pub failed_sources: Vec<String>,
    pub placeholders: Vec<Bucket>,
}

impl StageReport {
    pub fn added_by(&self, stage: Stage) -> usize {
        self.added
            .iter()
            .filter(|(s, _, _)| *s == stage)
            .map(|(_, _, n)| n)
            .sum()
    }

    fn record(&mut self, stage: Stage, before: [usize; 3], after: &Buckets) {
        let now = after.lens();
        for (i, b) in Bucket::ALL.into_iter().enumerate() {
            let n = now[i].saturating_sub(before[i]);
            if n > 0 {
                counter!("digest_stage_added_total", "stage" => stage.as_str()).increment(n as u64);
                info!(target: "select", stage = stage.as_str(), bucket = %b, added = n, "stage contributed");
                self.added.push((stage, b, n));
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub buckets: Buckets,
    pub report: StageReport,
}

/// Prepare a fallback pool: normalize, dedupe, rank, recency-filter.
fn prepare(raw: Vec<RawEntry>, cfg: &DigestConfig, tz: &FixedOffset, now: &Timestamp) -> Vec<Item> {
    let items = rank_and_dedupe(normalize_all(raw, tz), now);
    filter_recent(items, cfg.window.days, now, cfg.display.per_section).items
}

async fn fetch_feeds(
    providers: &[Box<dyn SourceProvider>],
    report: &mut StageReport,
) -> Vec<RawEntry> {
    let mut raw = Vec::new();
    for outcome in collect(providers).await {
        if outcome.is_failure() {
            report.failed_sources.push(outcome.provider().to_string());
        }
        raw.extend(outcome.into_entries());
    }
    raw
}

/// Run the whole cascade over one run's collected items.
pub async fn select(
    cfg: &DigestConfig,
    collected: Vec<Item>,
    fallbacks: &Fallbacks,
    now: Timestamp,
) -> Selection {
    let quota = cfg.display.per_section;
    let tz = cfg.window.tz();
    let ctx = StageCtx {
        filters: &cfg.filters,
        now,
    };
    let mut report = StageReport::default();

    // Normalizer output → dedupe/rank → recency filter
    let ranked = rank_and_dedupe(collected, &now);
    let recent = filter_recent(
        ranked,
        cfg.window.days,
        &now,
        PRIMARY_FALLBACK_FACTOR * quota,
    );
    report.recency_relaxed = recent.relaxed;
    let pool = recent.items;
    info!(target: "select", candidates = pool.len(), relaxed = recent.relaxed, "candidate pool ready");

    let mut state = BucketState::new(quota);

    // 1) strict
    let before = state.buckets().lens();
    state = strict_pass(state, &pool, &ctx);
    report.record(Stage::Strict, before, state.buckets());

    // 2) company backfill at strict threshold
    if !state.is_full(Bucket::Companies) {
        let before = state.buckets().lens();
        state = company_backfill(state, &pool, &ctx, cfg.filters.min_relevance);
        report.record(Stage::CompanyBackfill, before, state.buckets());
    }

    // 3) relaxed threshold
    if state.is_empty(Bucket::Markets) || !state.is_full(Bucket::Companies) {
        let before = state.buckets().lens();
        state = relaxed_pass(state, &pool, &ctx);
        report.record(Stage::Relaxed, before, state.buckets());
    }

    // 4) alternate sources
    state = alternate_sources(state, cfg, fallbacks, &tz, &now, &mut report).await;

    // 5) news API, general feed
    state = news_api_fallback(state, cfg, fallbacks, &tz, &now, &mut report).await;

    // Non-empty guarantee
    let before = state.buckets().lens();
    state = ensure_non_empty(state);
    for (i, b) in Bucket::ALL.into_iter().enumerate() {
        if before[i] == 0 {
            report.placeholders.push(b);
            report.added.push((Stage::Placeholder, b, 1));
            counter!("digest_placeholders_total").increment(1);
        }
    }
    if !report.placeholders.is_empty() {
        info!(target: "select", buckets = ?report.placeholders, "placeholders inserted");
    }

    Selection {
        buckets: state.into_buckets(),
        report,
    }
}

async fn alternate_sources(
    mut state: BucketState,
    cfg: &DigestConfig,
    fb: &Fallbacks,
    tz: &FixedOffset,
    now: &Timestamp,
    report: &mut StageReport,
) -> BucketState {
    let before = state.buckets().lens();

    if state.is_empty(Bucket::Markets) && !fb.markets_feeds.is_empty() {
        let raw = fetch_feeds(&fb.markets_feeds, report).await;
        let pool = prepare(raw, cfg, tz, now);
        state = fill_from_pool(state, Bucket::Markets, &pool, |_| true);
    }

    if !state.is_full(Bucket::Companies) && !fb.companies_feeds.is_empty() {
        let raw = fetch_feeds(&fb.companies_feeds, report).await;
        let pool = prepare(raw, cfg, tz, now);
        state = fill_from_pool(state, Bucket::Companies, &pool, |_| true);
    }

    if !state.is_full(Bucket::Companies) && !fb.tickers.is_empty() {
        if let Some(api) = fb.news_api.as_deref() {
            let to = now.date_naive();
            let from = to - Duration::days(cfg.window.days.clamp(1, MAX_WINDOW_DAYS));
            for symbol in &fb.tickers {
                if state.is_full(Bucket::Companies) {
                    break;
                }
                let label = format!("{}:{}", api.name(), symbol);
                let outcome = outcome_of(&label, api.company_news(symbol, from, to).await);
                if outcome.is_failure() {
                    report.failed_sources.push(label);
                }
                let pool = prepare(outcome.into_entries(), cfg, tz, now);
                state = fill_from_pool(state, Bucket::Companies, &pool, |_| true);
            }
        }
    }

    report.record(Stage::AlternateSources, before, state.buckets());
    state
}

async fn news_api_fallback(
    mut state: BucketState,
    cfg: &DigestConfig,
    fb: &Fallbacks,
    tz: &FixedOffset,
    now: &Timestamp,
    report: &mut StageReport,
) -> BucketState {
    let need_markets = !state.is_full(Bucket::Markets);
    let need_companies = !state.is_full(Bucket::Companies);
    let Some(api) = fb.news_api.as_deref() else {
        return state;
    };
    if !(need_markets || need_companies) {
        return state;
    }

    let before = state.buckets().lens();
    let outcome = outcome_of(api.name(), api.general_news().await);
    if outcome.is_failure() {
        report.failed_sources.push(api.name().to_string());
    }
    let days = cfg.window.days;
    let pool: Vec<Item> = rank_and_dedupe(normalize_all(outcome.into_entries(), tz), now)
        .into_iter()
        .filter(|it| within_window(it, days, now))
        .collect();

    if need_markets {
        state = fill_from_pool(state, Bucket::Markets, &pool, |it| !looks_company_specific(it));
    }
    if need_companies {
        state = fill_from_pool(state, Bucket::Companies, &pool, looks_company_specific);
    }
    report.record(Stage::NewsApi, before, state.buckets());
    state
}
