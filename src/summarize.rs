//! Summarizer: provider abstraction + file cache + quality retry, and the
//! assembly of per-bucket `BriefEntry` lists for rendering.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::AiConfig;
use crate::ingest::types::Item;
use crate::select::{Bucket, Buckets};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_TIMEOUT_SECS: u64 = 90;

pub const EMPTY_WHY: &str = "Why it matters: see source for context.";
pub const PLACEHOLDER_WHY: &str = "Why it matters: nothing in this category cleared the filters this period.";

const SUMMARY_SNIPPET_CHARS: usize = 280;
const FALLBACK_SNIPPET_CHARS: usize = 300;
const MIN_WHY_CHARS: usize = 40;
const MIN_WHY_SENTENCES: usize = 2;

const DEFAULT_SYSTEM_PROMPT: &str = "You write a weekly finance brief for busy readers. \
For the given headline and source snippet, reply with ONLY a JSON object \
{\"summary\": \"...\", \"why\": \"...\"}. The summary is one or two plain sentences of fact. \
The why field starts with \"Why it matters:\" and gives two short sentences on the \
consequence for markets, the economy or the company. No emojis, no advice.";

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// One-paragraph summary plus a "why it matters" rationale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub summary: String,
    pub why: String,
}

/// Used by the pipeline. `Err` means transport failure; callers fall back to the snippet.
pub trait Summarizer: Send + Sync {
    fn summarize<'a>(
        &'a self,
        title: &'a str,
        snippet: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Summary>> + Send + 'a>>;
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Factory: build a summarizer according to config and environment variables.
///
/// * `AI_TEST_MODE=mock` → deterministic mock wrapped in the cache.
/// * disabled config or missing key → `DisabledClient`.
/// * otherwise OpenAI wrapped in the cache.
pub fn build_summarizer(cfg: &AiConfig) -> DynSummarizer {
    let mock_env = std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false);
    if mock_env || (cfg.enabled && cfg.provider == "mock") {
        return Arc::new(CachingClient::new(
            MockProvider::default(),
            system_prompt(cfg),
            PathBuf::from(&cfg.cache_dir),
        ));
    }
    if !cfg.enabled {
        return Arc::new(DisabledClient);
    }
    if cfg.api_key.is_empty() {
        warn!(target: "summarize", provider = %cfg.provider, "no API key; summarizer disabled");
        return Arc::new(DisabledClient);
    }
    match OpenAiProvider::new(cfg) {
        Ok(p) => Arc::new(CachingClient::new(
            p,
            system_prompt(cfg),
            PathBuf::from(&cfg.cache_dir),
        )),
        Err(e) => {
            warn!(target: "summarize", error = %e, "could not build OpenAI client; summarizer disabled");
            Arc::new(DisabledClient)
        }
    }
}

fn system_prompt(cfg: &AiConfig) -> String {
    if let Some(path) = cfg.system_prompt_path.as_deref() {
        match fs::read_to_string(path) {
            Ok(s) if !s.trim().is_empty() => return s,
            Ok(_) => warn!(target: "summarize", path, "system prompt file empty; using built-in"),
            Err(e) => warn!(target: "summarize", path, error = %e, "system prompt unreadable; using built-in"),
        }
    }
    DEFAULT_SYSTEM_PROMPT.to_string()
}

pub fn user_prompt(title: &str, snippet: &str) -> String {
    format!("Title: {title}\nSource snippet: {snippet}\nRespond with ONLY the JSON object.")
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level completion call returning raw model text. Separated so the same
/// caching wrapper serves production and tests.
pub trait Provider: Send + Sync + 'static {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// OpenAI Chat Completions.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiProvider {
    pub fn new(cfg: &AiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("finance-digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(OPENAI_TIMEOUT_SECS))
            .build()
            .context("building OpenAI HTTP client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        })
    }
}

impl Provider for OpenAiProvider {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: system,
                    },
                    Msg {
                        role: "user",
                        content: user,
                    },
                ],
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let resp = self
                .http
                .post(OPENAI_URL)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .context("OpenAI request")?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                bail!("OpenAI error {}: {}", status.as_u16(), truncate_chars(&body, 300));
            }
            let body: Resp = resp.json().await.context("decoding OpenAI response")?;
            let content = body
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| anyhow!("OpenAI response has no choices"))?;
            Ok(content.trim().to_string())
        })
    }
    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always errors; every item then falls back to its snippet.
pub struct DisabledClient;

impl Summarizer for DisabledClient {
    fn summarize<'a>(
        &'a self,
        _title: &'a str,
        _snippet: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Summary>> + Send + 'a>> {
        Box::pin(async { Err(anyhow!("summarizer disabled")) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests and local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            fixed: r#"{"summary":"Mock summary of the story.","why":"Why it matters: this is a mock rationale. It stands in for model output."}"#
                .to_string(),
        }
    }
}

impl Provider for MockProvider {
    fn complete<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + one quality retry)
// ------------------------------------------------------------

pub struct CachingClient<P: Provider> {
    inner: P,
    system: String,
    cache_dir: PathBuf,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, system: String, cache_dir: PathBuf) -> Self {
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            debug!(target: "summarize", error = %e, dir = %cache_dir.display(), "cache dir unavailable");
        }
        Self {
            inner,
            system,
            cache_dir,
        }
    }

    async fn summarize_impl(&self, title: &str, snippet: &str) -> Result<Summary> {
        let user = user_prompt(title, snippet);
        let key = cache_key(&self.system, &user);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            debug!(target: "summarize", key = %key, "cache hit");
            return Ok(hit);
        }

        let first = parse_summary_response(&self.inner.complete(&self.system, &user).await?, snippet);
        let chosen = if passes_quality(&first) {
            first
        } else {
            counter!("digest_summarize_retries_total").increment(1);
            debug!(target: "summarize", provider = self.inner.name(), "low-quality output, retrying once");
            match self.inner.complete(&self.system, &user).await {
                Ok(text) => better_of(first, parse_summary_response(&text, snippet)),
                Err(e) => {
                    debug!(target: "summarize", error = %e, "retry failed; keeping first result");
                    first
                }
            }
        };

        // low-quality output stays uncached so a later run can try again
        if passes_quality(&chosen) {
            if let Err(e) = write_cache_file(&self.cache_dir, &key, &chosen) {
                debug!(target: "summarize", error = %e, "cache write failed");
            }
        }
        Ok(chosen)
    }
}

impl<P: Provider> Summarizer for CachingClient<P> {
    fn summarize<'a>(
        &'a self,
        title: &'a str,
        snippet: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Summary>> + Send + 'a>> {
        Box::pin(self.summarize_impl(title, snippet))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// Response parsing + quality
// ------------------------------------------------------------

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*|\s*```$").expect("fence regex"));
static WHY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)why it matters\s*:\s*(.+)$").expect("why regex"));

#[derive(Deserialize)]
struct RawSummary {
    #[serde(default)]
    summary: serde_json::Value,
    #[serde(default)]
    why: serde_json::Value,
}

fn value_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Strict JSON first (code fences stripped). Otherwise split the text on
/// "Why it matters:"; an empty summary falls back to the snippet.
pub fn parse_summary_response(text: &str, snippet: &str) -> Summary {
    let text = FENCE_RE.replace_all(text.trim(), "").to_string();

    if let Ok(raw) = serde_json::from_str::<RawSummary>(&text) {
        let summary = value_text(&raw.summary);
        let why = value_text(&raw.why);
        if !summary.is_empty() && !why.is_empty() {
            return Summary { summary, why };
        }
    }

    let (summary, why) = match WHY_RE.captures(&text) {
        Some(c) => {
            let why = format!("Why it matters: {}", c[1].trim());
            let start = c.get(0).map(|m| m.start()).unwrap_or(text.len());
            (text[..start].trim().to_string(), why)
        }
        None => (text.trim().to_string(), String::new()),
    };
    Summary {
        summary: if summary.is_empty() {
            truncate_chars(snippet, SUMMARY_SNIPPET_CHARS).trim().to_string()
        } else {
            summary
        },
        why: if why.is_empty() {
            EMPTY_WHY.to_string()
        } else {
            why
        },
    }
}

fn sentence_count(s: &str) -> usize {
    s.split(['.', '!', '?'])
        .filter(|part| part.chars().any(|c| c.is_alphanumeric()))
        .count()
}

/// Non-empty summary; rationale with at least two sentences and 40 chars.
pub fn passes_quality(s: &Summary) -> bool {
    !s.summary.trim().is_empty()
        && s.why.chars().count() >= MIN_WHY_CHARS
        && sentence_count(&s.why) >= MIN_WHY_SENTENCES
}

fn better_of(first: Summary, second: Summary) -> Summary {
    match (passes_quality(&first), passes_quality(&second)) {
        (_, true) => second,
        (true, false) => first,
        (false, false) => {
            if second.why.chars().count() > first.why.chars().count() {
                second
            } else {
                first
            }
        }
    }
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn cache_key(system: &str, user: &str) -> String {
    let mut h = Sha256::new();
    h.update(system.as_bytes());
    h.update([0u8]);
    h.update(user.as_bytes());
    h.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<Summary> {
    let buf = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &Summary) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value).map_err(io::Error::other)?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Brief assembly
// ------------------------------------------------------------

/// One rendered line of the digest.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BriefEntry {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub why: String,
    /// `YYYY-MM-DD`, or empty when undated.
    pub published: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BriefSections {
    #[serde(rename = "macro")]
    pub macro_entries: Vec<BriefEntry>,
    pub markets: Vec<BriefEntry>,
    pub companies: Vec<BriefEntry>,
}

impl BriefSections {
    pub fn get(&self, b: Bucket) -> &[BriefEntry] {
        match b {
            Bucket::Macro => &self.macro_entries,
            Bucket::Markets => &self.markets,
            Bucket::Companies => &self.companies,
        }
    }

    fn get_mut(&mut self, b: Bucket) -> &mut Vec<BriefEntry> {
        match b {
            Bucket::Macro => &mut self.macro_entries,
            Bucket::Markets => &mut self.markets,
            Bucket::Companies => &mut self.companies,
        }
    }
}

fn entry_base(item: &Item) -> BriefEntry {
    BriefEntry {
        title: if item.title.is_empty() {
            "(no title)".to_string()
        } else {
            item.title.clone()
        },
        url: if item.url.is_empty() {
            "#".to_string()
        } else {
            item.url.clone()
        },
        summary: String::new(),
        why: String::new(),
        published: item
            .published
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    }
}

/// Summarize one item; placeholders and transport failures never error.
pub async fn summarize_item(summarizer: &dyn Summarizer, item: &Item) -> BriefEntry {
    let mut entry = entry_base(item);
    if item.is_placeholder() {
        entry.summary = item.summary.clone();
        entry.why = PLACEHOLDER_WHY.to_string();
        return entry;
    }
    let snippet = if item.summary.is_empty() {
        item.title.as_str()
    } else {
        item.summary.as_str()
    };
    let result = summarizer.summarize(&entry.title, snippet).await;
    match result {
        Ok(s) => {
            entry.summary = s.summary;
            entry.why = s.why;
        }
        Err(e) => {
            counter!("digest_summarize_fallbacks_total").increment(1);
            warn!(target: "summarize", provider = summarizer.provider_name(), error = %e, "summarizer failed; using snippet");
            entry.summary = truncate_chars(snippet, FALLBACK_SNIPPET_CHARS);
            entry.why = format!("Why it matters: source context unavailable ({e}).");
        }
    }
    entry
}

/// Summarize every selected item, bucket by bucket, in order.
pub async fn summarize_sections(summarizer: &dyn Summarizer, buckets: &Buckets) -> BriefSections {
    let mut out = BriefSections::default();
    for (b, items) in buckets.iter() {
        for it in items {
            let entry = summarize_item(summarizer, it).await;
            out.get_mut(b).push(entry);
        }
    }
    info!(
        target: "summarize",
        provider = summarizer.provider_name(),
        macro_n = out.macro_entries.len(),
        markets_n = out.markets.len(),
        companies_n = out.companies.len(),
        "sections summarized"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_code_fences() {
        let s = parse_summary_response(
            "```json\n{\"summary\":\"Fed held.\",\"why\":\"Why it matters: rates stay put.\"}\n```",
            "snip",
        );
        assert_eq!(s.summary, "Fed held.");
        assert_eq!(s.why, "Why it matters: rates stay put.");
    }

    #[test]
    fn loose_text_splits_on_why() {
        let s = parse_summary_response(
            "Stocks slid on Friday. Why it matters: risk appetite faded. Volumes were thin.",
            "snip",
        );
        assert_eq!(s.summary, "Stocks slid on Friday.");
        assert!(s.why.starts_with("Why it matters: risk appetite"));
    }

    #[test]
    fn empty_reply_uses_snippet_and_stock_rationale() {
        let s = parse_summary_response("   ", "The snippet text");
        assert_eq!(s.summary, "The snippet text");
        assert_eq!(s.why, EMPTY_WHY);
    }

    #[test]
    fn quality_needs_two_sentences() {
        let one = Summary {
            summary: "x".into(),
            why: "Why it matters: a single long sentence without a break".into(),
        };
        assert!(!passes_quality(&one));
        let two = Summary {
            summary: "x".into(),
            why: "Why it matters: yields rose. Mortgage costs follow.".into(),
        };
        assert!(passes_quality(&two));
    }

    #[test]
    fn cache_key_is_stable_hex() {
        let a = cache_key("sys", "user");
        assert_eq!(a.len(), 64);
        assert_eq!(a, cache_key("sys", "user"));
        assert_ne!(a, cache_key("sys", "other"));
    }
}
