// tests/summarize.rs
// Summarizer contract: caching, single quality retry, fallbacks, placeholders.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use finance_digest::ingest::types::{Item, OriginKind};
use finance_digest::select::{placeholder, Bucket};
use finance_digest::summarize::{
    summarize_item, CachingClient, DisabledClient, MockProvider, Provider, Summarizer, PLACEHOLDER_WHY,
};

/// Replays canned replies in order and counts calls.
struct Scripted {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn new(replies: Vec<Result<String>>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                replies: Mutex::new(replies.into()),
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl Provider for Scripted {
    fn complete<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("script exhausted")));
        Box::pin(async move { next })
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

const GOOD: &str = r#"{"summary":"The Fed kept rates unchanged.","why":"Why it matters: borrowing costs stay high. Mortgage demand may keep cooling."}"#;
const THIN: &str = r#"{"summary":"The Fed kept rates unchanged.","why":"Why it matters: rates."}"#;

fn news(title: &str, summary: &str) -> Item {
    Item {
        source: "Wire".into(),
        url: String::new(),
        title: title.into(),
        summary: summary.into(),
        published: None,
        origin_kind: OriginKind::News,
    }
}

#[tokio::test]
async fn good_output_is_used_without_retry_and_cached() {
    let dir = tempfile::tempdir().unwrap();
    let (p, calls) = Scripted::new(vec![Ok(GOOD.into())]);
    let client = CachingClient::new(p, "sys".into(), dir.path().to_path_buf());

    let a = client.summarize("Fed holds", "The Fed held.").await.unwrap();
    assert!(a.why.starts_with("Why it matters:"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // second call is served from the file cache
    let b = client.summarize("Fed holds", "The Fed held.").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn thin_rationale_triggers_exactly_one_retry() {
    let dir = tempfile::tempdir().unwrap();
    let (p, calls) = Scripted::new(vec![Ok(THIN.into()), Ok(GOOD.into())]);
    let client = CachingClient::new(p, "sys".into(), dir.path().to_path_buf());

    let s = client.summarize("Fed holds", "The Fed held.").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(s.why.contains("Mortgage demand"));
}

#[tokio::test]
async fn retry_that_is_still_thin_does_not_retry_again() {
    let dir = tempfile::tempdir().unwrap();
    let (p, calls) = Scripted::new(vec![Ok(THIN.into()), Ok(THIN.into()), Ok(GOOD.into())]);
    let client = CachingClient::new(p, "sys".into(), dir.path().to_path_buf());

    let s = client.summarize("Fed holds", "The Fed held.").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(s.why, "Why it matters: rates.");
}

#[tokio::test]
async fn thin_output_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let (p, calls) = Scripted::new(vec![Ok(THIN.into()), Ok(THIN.into()), Ok(GOOD.into())]);
    let client = CachingClient::new(p, "sys".into(), dir.path().to_path_buf());

    client.summarize("Fed holds", "The Fed held.").await.unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    // the next run asks the provider again and caches the good reply
    let s = client.summarize("Fed holds", "The Fed held.").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(s.why.contains("Mortgage demand"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn transport_failure_falls_back_to_snippet() {
    let dir = tempfile::tempdir().unwrap();
    let (p, calls) = Scripted::new(vec![Err(anyhow!("timeout"))]);
    let client = CachingClient::new(p, "sys".into(), dir.path().to_path_buf());

    let long = "x".repeat(400);
    let e = summarize_item(&client, &news("Fed holds", &long)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "no retry on transport failure");
    assert_eq!(e.summary.chars().count(), 300);
    assert_eq!(e.why, "Why it matters: source context unavailable (timeout).");
    assert_eq!(e.url, "#");
}

#[tokio::test]
async fn disabled_client_uses_title_when_snippet_is_empty() {
    let e = summarize_item(&DisabledClient, &news("Stocks rally", "")).await;
    assert_eq!(e.summary, "Stocks rally");
    assert!(e.why.contains("summarizer disabled"));
}

#[tokio::test]
async fn placeholders_never_reach_the_provider() {
    let dir = tempfile::tempdir().unwrap();
    let (p, calls) = Scripted::new(vec![]);
    let client = CachingClient::new(p, "sys".into(), dir.path().to_path_buf());

    let e = summarize_item(&client, &placeholder(Bucket::Markets)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(e.why, PLACEHOLDER_WHY);
    assert_eq!(e.url, "#");
    assert!(e.published.is_empty());
}

#[tokio::test]
async fn mock_provider_passes_quality() {
    let dir = tempfile::tempdir().unwrap();
    let client = CachingClient::new(MockProvider::default(), "sys".into(), dir.path().to_path_buf());
    let s = client.summarize("t", "s").await.unwrap();
    assert_eq!(s.summary, "Mock summary of the story.");
    assert_eq!(client.provider_name(), "mock");
}
