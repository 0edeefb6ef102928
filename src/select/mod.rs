// src/select/mod.rs
//! Bucket selection: pure stage functions over `BucketState`.
//!
//! Every stage takes the current state by value plus a candidate pool and
//! returns the updated state. Stages only add items, never remove them, never
//! exceed the per-bucket quota, and never place one item (by `ItemKey`) in
//! two buckets. `cascade` composes them and feeds in the fallback sources.

pub mod cascade;

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::config::FilterConfig;
use crate::dedup::rank;
use crate::ingest::types::{Item, ItemKey, OriginKind, Timestamp};
use crate::relevance::{classify, is_story_relevant, looks_company_specific};

pub use cascade::{select, Fallbacks, Selection, Stage, StageReport};

pub const PLACEHOLDER_SOURCE: &str = "Finance Digest";
pub const PLACEHOLDER_TITLE: &str = "No items found for this category in the window";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Macro,
    Markets,
    Companies,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Macro, Bucket::Markets, Bucket::Companies];

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Macro => "macro",
            Bucket::Markets => "markets",
            Bucket::Companies => "companies",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Bucket::Macro => "Macro & Economy",
            Bucket::Markets => "Markets",
            Bucket::Companies => "Companies & Filings",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three topical lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Buckets {
    #[serde(rename = "macro")]
    pub macro_items: Vec<Item>,
    pub markets: Vec<Item>,
    pub companies: Vec<Item>,
}

impl Buckets {
    pub fn get(&self, b: Bucket) -> &[Item] {
        match b {
            Bucket::Macro => &self.macro_items,
            Bucket::Markets => &self.markets,
            Bucket::Companies => &self.companies,
        }
    }

    fn get_mut(&mut self, b: Bucket) -> &mut Vec<Item> {
        match b {
            Bucket::Macro => &mut self.macro_items,
            Bucket::Markets => &mut self.markets,
            Bucket::Companies => &mut self.companies,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bucket, &[Item])> + '_ {
        Bucket::ALL.into_iter().map(move |b| (b, self.get(b)))
    }

    pub fn lens(&self) -> [usize; 3] {
        Bucket::ALL.map(|b| self.get(b).len())
    }
}

/// Buckets under construction plus the keys already placed anywhere.
#[derive(Debug, Clone)]
pub struct BucketState {
    buckets: Buckets,
    selected: HashSet<ItemKey>,
    quota: usize,
}

impl BucketState {
    pub fn new(quota: usize) -> Self {
        Self {
            buckets: Buckets::default(),
            selected: HashSet::new(),
            quota: quota.max(1),
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    pub fn into_buckets(self) -> Buckets {
        self.buckets
    }

    pub fn len(&self, b: Bucket) -> usize {
        self.buckets.get(b).len()
    }

    pub fn is_empty(&self, b: Bucket) -> bool {
        self.len(b) == 0
    }

    pub fn is_full(&self, b: Bucket) -> bool {
        self.len(b) >= self.quota
    }

    pub fn is_complete(&self) -> bool {
        Bucket::ALL.iter().all(|&b| self.is_full(b))
    }

    pub fn is_selected(&self, item: &Item) -> bool {
        self.selected.contains(&item.key())
    }

    /// Append `item` to `b` unless the bucket is full or the item is already placed.
    pub fn offer(&mut self, b: Bucket, item: &Item) -> bool {
        if self.is_full(b) {
            return false;
        }
        if !self.selected.insert(item.key()) {
            return false;
        }
        self.buckets.get_mut(b).push(item.clone());
        true
    }
}

/// Shared inputs for the pure stages.
#[derive(Debug, Clone, Copy)]
pub struct StageCtx<'a> {
    pub filters: &'a FilterConfig,
    pub now: Timestamp,
}

/// Partition `pool` by classification at `min_relevance`; each bucket newest first.
/// Dropped items appear nowhere, every other item in exactly one bucket.
pub fn group(pool: &[Item], filters: &FilterConfig, min_relevance: u32, now: &Timestamp) -> Buckets {
    let mut out = Buckets::default();
    for it in pool {
        if let Some(b) = classify(it, filters, min_relevance).bucket() {
            out.get_mut(b).push(it.clone());
        }
    }
    for b in Bucket::ALL {
        let list = std::mem::take(out.get_mut(b));
        *out.get_mut(b) = rank(list, now);
    }
    out
}

/// Stage 1: classify at the configured threshold and fill each bucket.
pub fn strict_pass(mut state: BucketState, pool: &[Item], ctx: &StageCtx<'_>) -> BucketState {
    if state.is_complete() {
        return state;
    }
    let grouped = group(pool, ctx.filters, ctx.filters.min_relevance, &ctx.now);
    for (b, items) in grouped.iter() {
        for it in items {
            if state.is_full(b) {
                break;
            }
            state.offer(b, it);
        }
    }
    state
}

/// Stage 2 (and the second half of stage 3): top up `companies` from the
/// ranked pool with items that are relevant at `min_relevance` and company-specific.
pub fn company_backfill(
    mut state: BucketState,
    pool: &[Item],
    ctx: &StageCtx<'_>,
    min_relevance: u32,
) -> BucketState {
    for it in pool {
        if state.is_full(Bucket::Companies) {
            break;
        }
        if state.is_selected(it) {
            continue;
        }
        if is_story_relevant(it, ctx.filters, min_relevance) && looks_company_specific(it) {
            state.offer(Bucket::Companies, it);
        }
    }
    state
}

/// Stage 3: relax the threshold by one (floor 1). An empty `markets` bucket
/// adopts the relaxed classification's markets list; `companies` gets a relaxed backfill.
pub fn relaxed_pass(mut state: BucketState, pool: &[Item], ctx: &StageCtx<'_>) -> BucketState {
    let relaxed = ctx.filters.relaxed_min_relevance();
    if state.is_empty(Bucket::Markets) {
        let grouped = group(pool, ctx.filters, relaxed, &ctx.now);
        for it in grouped.get(Bucket::Markets) {
            if state.is_full(Bucket::Markets) {
                break;
            }
            state.offer(Bucket::Markets, it);
        }
    }
    if !state.is_full(Bucket::Companies) {
        state = company_backfill(state, pool, ctx, relaxed);
    }
    state
}

/// Stages 4/5 helper: offer pool items accepted by `accept` to bucket `b`, in order.
pub fn fill_from_pool<F>(mut state: BucketState, b: Bucket, pool: &[Item], accept: F) -> BucketState
where
    F: Fn(&Item) -> bool,
{
    for it in pool {
        if state.is_full(b) {
            break;
        }
        if accept(it) {
            state.offer(b, it);
        }
    }
    state
}

/// Synthetic entry standing in for an empty bucket.
pub fn placeholder(b: Bucket) -> Item {
    Item {
        source: PLACEHOLDER_SOURCE.to_string(),
        url: String::new(),
        title: PLACEHOLDER_TITLE.to_string(),
        summary: format!(
            "No {} stories met the filters during this period.",
            b.as_str()
        ),
        published: None,
        origin_kind: OriginKind::Placeholder,
    }
}

/// Non-empty guarantee: every empty bucket receives exactly one placeholder.
pub fn ensure_non_empty(mut state: BucketState) -> BucketState {
    for b in Bucket::ALL {
        if state.is_empty(b) {
            state.buckets.get_mut(b).push(placeholder(b));
        }
    }
    state
}
