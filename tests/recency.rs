// tests/recency.rs
use chrono::{Duration, FixedOffset, TimeZone};
use finance_digest::ingest::types::{Item, OriginKind, Timestamp};
use finance_digest::recency::filter_recent;

fn now() -> Timestamp {
    FixedOffset::west_opt(7 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 16, 8, 0, 0)
        .unwrap()
}

fn aged(title: &str, days: i64) -> Item {
    Item {
        source: "S".into(),
        url: String::new(),
        title: title.into(),
        summary: String::new(),
        published: Some(now() - Duration::days(days)),
        origin_kind: OriginKind::News,
    }
}

#[test]
fn keeps_only_in_window_items() {
    let r = filter_recent(vec![aged("in", 2), aged("out", 9)], 7, &now(), 5);
    assert!(!r.relaxed);
    assert_eq!(r.items.len(), 1);
    assert_eq!(r.items[0].title, "in");
}

#[test]
fn empty_window_falls_back_to_most_recent_n() {
    let items = vec![aged("d30", 30), aged("d10", 10), aged("d20", 20), aged("d12", 12)];
    let r = filter_recent(items, 7, &now(), 2);
    assert!(r.relaxed);
    let titles: Vec<&str> = r.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["d10", "d12"]);
}

#[test]
fn empty_input_is_not_relaxed() {
    let r = filter_recent(Vec::new(), 7, &now(), 3);
    assert!(!r.relaxed);
    assert!(r.items.is_empty());
}
