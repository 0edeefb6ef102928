// tests/ingest_dedup.rs
use chrono::{Duration, FixedOffset, TimeZone};
use finance_digest::dedup::{dedupe, rank_and_dedupe};
use finance_digest::ingest::types::{Item, OriginKind, Timestamp};

fn now() -> Timestamp {
    FixedOffset::west_opt(7 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 16, 8, 0, 0)
        .unwrap()
}

fn item(title: &str, source: &str, hours_ago: Option<i64>) -> Item {
    Item {
        source: source.into(),
        url: String::new(),
        title: title.into(),
        summary: String::new(),
        published: hours_ago.map(|h| now() - Duration::hours(h)),
        origin_kind: OriginKind::News,
    }
}

#[test]
fn case_differing_titles_from_one_source_collapse_to_first() {
    let raw = vec![
        item("Fed Holds Rates", "Wire", Some(5)),
        item("Other story", "Wire", Some(1)),
        item("FED HOLDS RATES", "Wire", Some(2)),
    ];
    let out = dedupe(raw);
    let titles: Vec<&str> = out.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Fed Holds Rates", "Other story"]);
}

#[test]
fn dedupe_is_idempotent() {
    let raw = vec![
        item("A", "S1", Some(3)),
        item("a", "S1", Some(1)),
        item("A", "S2", None),
        item("B", "S1", Some(10)),
    ];
    let once = rank_and_dedupe(raw, &now());
    let twice = rank_and_dedupe(once.clone(), &now());
    assert_eq!(once, twice);
    assert_eq!(once.len(), 3);
}

#[test]
fn ranking_is_newest_first_with_undated_in_front() {
    let out = rank_and_dedupe(
        vec![
            item("old", "S", Some(48)),
            item("new", "S", Some(1)),
            item("undated", "S", None),
        ],
        &now(),
    );
    let titles: Vec<&str> = out.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["undated", "new", "old"]);
}
