// tests/relevance_scenarios.rs
// Relevance gate and classifier on hand-picked items.

use finance_digest::config::FilterConfig;
use finance_digest::ingest::types::{Item, OriginKind};
use finance_digest::relevance::{assess, classify, is_story_relevant, relevance, Classification, Verdict};

fn item(title: &str, summary: &str, url: &str) -> Item {
    Item {
        source: "Wire".into(),
        url: url.into(),
        title: title.into(),
        summary: summary.into(),
        published: None,
        origin_kind: OriginKind::News,
    }
}

fn filing(title: &str) -> Item {
    Item {
        source: "SEC EDGAR".into(),
        url: "https://www.sec.gov/Archives/x".into(),
        title: title.into(),
        summary: String::new(),
        published: None,
        origin_kind: OriginKind::Filing,
    }
}

fn filters_with_negative(min: u32) -> FilterConfig {
    FilterConfig {
        min_relevance: min,
        negative_terms: vec!["war".into()],
        ..FilterConfig::default()
    }
}

#[test]
fn fed_rates_headline_is_macro() {
    let it = item("Fed holds rates steady, signals cuts ahead", "", "");
    assert!(relevance(&it) >= 2, "score={}", relevance(&it));
    assert_eq!(
        classify(&it, &FilterConfig::default(), 2),
        Classification::Macro
    );
}

#[test]
fn words_containing_rates_are_not_finance() {
    let it = item("Tech firm operates new data center as investors cheer", "", "");
    assert_eq!(relevance(&it), 1);
    assert_eq!(
        classify(&it, &FilterConfig::default(), 2),
        Classification::Drop
    );
    assert_eq!(relevance(&item("Turbine generates record output", "", "")), 0);
}

#[test]
fn filing_with_empty_title_is_companies() {
    let it = filing("");
    assert_eq!(relevance(&it), 0);
    assert_eq!(
        classify(&it, &FilterConfig::default(), 2),
        Classification::Companies
    );
}

#[test]
fn filing_still_respects_allow_list() {
    let f = FilterConfig {
        allowed_sources: vec!["Reuters".into()],
        ..FilterConfig::default()
    };
    assert_eq!(assess(&filing("8-K"), &f, 2), Verdict::SourceNotAllowed);
}

#[test]
fn negative_term_drops_weak_item_only_at_strict_threshold() {
    let it = item("Stocks slip as war fears grow", "", "");
    assert_eq!(relevance(&it), 1);

    let strict = filters_with_negative(2);
    assert_eq!(assess(&it, &strict, 2), Verdict::NegativeTerm("war".into()));
    assert_eq!(classify(&it, &strict, 2), Classification::Drop);

    let loose = filters_with_negative(1);
    assert!(is_story_relevant(&it, &loose, 1));
    assert_eq!(classify(&it, &loose, 1), Classification::Markets);
}

#[test]
fn company_wording_wins_over_macro() {
    // both "fed" (macro) and "earnings" (company) present
    let it = item("Bank earnings beat as Fed pauses", "", "");
    assert_eq!(
        classify(&it, &FilterConfig::default(), 2),
        Classification::Companies
    );
}

#[test]
fn macro_check_reads_source_and_title() {
    let mut it = item("Stocks and bonds rally", "", "");
    assert_eq!(classify(&it, &FilterConfig::default(), 2), Classification::Macro);
    it.title = "Stocks rally on Wall Street".into();
    it.source = "Federal Reserve".into();
    assert_eq!(classify(&it, &FilterConfig::default(), 2), Classification::Macro);
    it.source = "Wire".into();
    assert_eq!(classify(&it, &FilterConfig::default(), 2), Classification::Markets);
}

#[test]
fn drop_path_spares_strongly_financial_items() {
    let f = FilterConfig {
        min_relevance: 5,
        drop_if_url_path_contains: vec!["/world/".into()],
        ..FilterConfig::default()
    };
    // 3 terms: under the threshold and under the strong bar max(3, min + 1) = 6
    let weak = item("Stocks rally as investors cheer", "", "https://x.com/world/a");
    assert!(matches!(assess(&weak, &f, 5), Verdict::DropPath(_)));

    // a weak item is dropped on that path but merely unscored elsewhere
    let f2 = FilterConfig {
        min_relevance: 2,
        drop_if_url_path_contains: vec!["/world/".into()],
        ..FilterConfig::default()
    };
    let one = item("Stocks drift", "", "https://x.com/world/b");
    assert!(matches!(assess(&one, &f2, 2), Verdict::DropPath(_)));
    let elsewhere = item("Stocks drift", "", "https://x.com/business/b");
    assert_eq!(assess(&elsewhere, &f2, 2), Verdict::BelowThreshold { score: 1 });
}

#[test]
fn classification_is_deterministic() {
    let f = filters_with_negative(2);
    let items = vec![
        item("Fed holds rates steady", "", ""),
        item("Nasdaq ends flat", "", ""),
        item("Acme earnings beat", "revenue up", ""),
        filing("10-Q"),
        item("Local bakery wins award", "", ""),
    ];
    for it in &items {
        let first = (relevance(it), classify(it, &f, 2));
        for _ in 0..5 {
            assert_eq!((relevance(it), classify(it, &f, 2)), first);
        }
    }
}

#[test]
fn relaxing_the_threshold_only_adds_items() {
    let f = FilterConfig {
        negative_terms: vec!["war".into(), "election".into()],
        drop_if_url_path_contains: vec!["/politics/".into()],
        ..FilterConfig::default()
    };
    let items = vec![
        item("Fed holds rates steady", "", ""),
        item("Stocks slip as war fears grow", "", ""),
        item("Nasdaq ends flat", "", "https://x.com/politics/n"),
        item("Treasury yields jump after CPI", "", "https://x.com/politics/t"),
        item("Election night recap", "", ""),
        item("Local bakery wins award", "", ""),
        filing(""),
    ];
    for min in 2..=4u32 {
        for it in &items {
            if is_story_relevant(it, &f, min) {
                assert!(
                    is_story_relevant(it, &f, min - 1),
                    "{:?} relevant at {} but not at {}",
                    it.title,
                    min,
                    min - 1
                );
            }
        }
    }
}
