// src/dedup.rs
//! Near-duplicate removal and recency ranking for one run's item set.

use std::collections::HashSet;

use crate::ingest::types::{Item, Timestamp};
use metrics::counter;

/// First occurrence per `ItemKey` wins; discovery order is preserved.
pub fn dedupe(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::with_capacity(items.len());
    let before = items.len();
    let out: Vec<Item> = items
        .into_iter()
        .filter(|it| seen.insert(it.key()))
        .collect();
    let dropped = before - out.len();
    if dropped > 0 {
        counter!("digest_dedup_dropped_total").increment(dropped as u64);
    }
    out
}

/// Newest first. Undated items count as `now` and so float to the front;
/// the sort is stable, ties keep discovery order.
pub fn rank(mut items: Vec<Item>, now: &Timestamp) -> Vec<Item> {
    // TODO: revisit undated-as-now as a tie-break once upstream feeds are audited for missing dates.
    items.sort_by(|a, b| {
        let ta = a.published.unwrap_or(*now);
        let tb = b.published.unwrap_or(*now);
        tb.cmp(&ta)
    });
    items
}

pub fn rank_and_dedupe(items: Vec<Item>, now: &Timestamp) -> Vec<Item> {
    rank(dedupe(items), now)
}
