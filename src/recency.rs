// src/recency.rs
//! Trailing-window filter with a most-recent-N fallback.

use chrono::Duration;
use tracing::warn;

use crate::dedup::rank;
use crate::ingest::types::{Item, Timestamp};

/// Tolerated clock skew for timestamps reported slightly in the future.
pub const FUTURE_SKEW_MINUTES: i64 = 60;

/// True iff `published` exists and lies in `[now - days, now + 1h]`.
/// A window too large to represent has no lower bound.
pub fn within_window(item: &Item, days: i64, now: &Timestamp) -> bool {
    let Some(ts) = item.published else {
        return false;
    };
    let lower = Duration::try_days(days).and_then(|d| now.checked_sub_signed(d));
    let upper = now
        .checked_add_signed(Duration::minutes(FUTURE_SKEW_MINUTES))
        .unwrap_or(*now);
    lower.map_or(true, |lo| ts >= lo) && ts <= upper
}

#[derive(Debug, Clone)]
pub struct Recent {
    pub items: Vec<Item>,
    /// Set when nothing was in the window and the newest `fallback_n` were taken instead.
    pub relaxed: bool,
}

/// Keep items inside the window. If none qualify, take the `fallback_n` most
/// recent items unfiltered so later stages still have something to work with.
pub fn filter_recent(items: Vec<Item>, days: i64, now: &Timestamp, fallback_n: usize) -> Recent {
    if items.is_empty() {
        return Recent {
            items,
            relaxed: false,
        };
    }
    let in_window: Vec<Item> = items
        .iter()
        .filter(|it| within_window(it, days, now))
        .cloned()
        .collect();
    if !in_window.is_empty() {
        return Recent {
            items: in_window,
            relaxed: false,
        };
    }
    warn!(
        target: "select",
        total = items.len(),
        days,
        fallback_n,
        "no items inside the recency window; taking most recent unfiltered"
    );
    let mut newest = rank(items, now);
    newest.truncate(fallback_n);
    Recent {
        items: newest,
        relaxed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::OriginKind;
    use chrono::{FixedOffset, TimeZone};

    fn now() -> Timestamp {
        FixedOffset::west_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 16, 8, 0, 0)
            .unwrap()
    }

    fn dated(ts: Option<Timestamp>) -> Item {
        Item {
            source: "S".into(),
            url: String::new(),
            title: "t".into(),
            summary: String::new(),
            published: ts,
            origin_kind: OriginKind::News,
        }
    }

    #[test]
    fn window_edges() {
        let n = now();
        assert!(within_window(&dated(Some(n - Duration::days(7))), 7, &n));
        assert!(!within_window(&dated(Some(n - Duration::days(7) - Duration::seconds(1))), 7, &n));
        assert!(within_window(&dated(Some(n + Duration::minutes(59))), 7, &n));
        assert!(!within_window(&dated(Some(n + Duration::minutes(61))), 7, &n));
        assert!(!within_window(&dated(None), 7, &n));
    }

    #[test]
    fn unrepresentable_window_has_no_lower_bound() {
        let n = now();
        let old = dated(Some(n - Duration::days(400_000)));
        assert!(within_window(&old, i64::MAX, &n));
        assert!(within_window(&old, 100_000_000, &n));
        assert!(!within_window(&dated(Some(n + Duration::hours(2))), i64::MAX, &n));
    }
}
