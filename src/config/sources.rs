// src/config/sources.rs
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use super::{clean_list, read_optional, resolve_path, resolve_secret};
use crate::ingest::providers::finnhub::DEFAULT_BASE_URL;

pub const DEFAULT_SOURCES_CONFIG_PATH: &str = "config/sources.toml";
pub const ENV_SOURCES_CONFIG_PATH: &str = "DIGEST_SOURCES_PATH";
pub const ENV_NEWS_API_KEY: &str = "FINNHUB_API_KEY";

fn default_user_agent() -> String {
    "finance-digest/0.1 (ops@example.com)".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_max_symbols() -> usize {
    5
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecConfig {
    #[serde(default)]
    pub current_feed: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FallbackFeeds {
    #[serde(default)]
    pub markets: Vec<FeedSpec>,
    #[serde(default)]
    pub companies: Vec<FeedSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsApiConfig {
    /// `"ENV"` reads `FINNHUB_API_KEY`; an empty key disables the API stages.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub tickers: Vec<String>,
    /// Per-run cap on per-symbol queries.
    #[serde(default = "default_max_symbols")]
    pub max_symbols: usize,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            base_url: default_base_url(),
            tickers: Vec::new(),
            max_symbols: default_max_symbols(),
        }
    }
}

impl NewsApiConfig {
    /// Resolved key, or `None` when the stage is unavailable.
    pub fn key(&self) -> Option<String> {
        let k = resolve_secret(&self.api_key, ENV_NEWS_API_KEY);
        (!k.is_empty()).then_some(k)
    }

    /// Tickers actually queried this run.
    pub fn capped_tickers(&self) -> Vec<String> {
        self.tickers
            .iter()
            .take(self.max_symbols)
            .map(|t| t.to_ascii_uppercase())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub rss: Vec<FeedSpec>,
    #[serde(default)]
    pub sec: SecConfig,
    #[serde(default)]
    pub fallback: FallbackFeeds,
    #[serde(default)]
    pub news_api: NewsApiConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            rss: Vec::new(),
            sec: SecConfig::default(),
            fallback: FallbackFeeds::default(),
            news_api: NewsApiConfig::default(),
        }
    }
}

impl SourcesConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: SourcesConfig = toml::from_str(s)?;
        cfg.news_api.tickers = clean_list(cfg.news_api.tickers);
        cfg.sec.current_feed = cfg.sec.current_feed.filter(|u| !u.trim().is_empty());
        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }
        Ok(cfg)
    }

    /// `--sources` path, then `$DIGEST_SOURCES_PATH`, then `config/sources.toml`.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let (path, explicit) =
            resolve_path(cli_path, ENV_SOURCES_CONFIG_PATH, DEFAULT_SOURCES_CONFIG_PATH);
        match read_optional(&path, explicit)? {
            Some(s) => Self::from_toml_str(&s),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feeds_and_caps_tickers() {
        let cfg = SourcesConfig::from_toml_str(
            r#"
[[rss]]
name = "CNBC Markets"
url = "https://example.com/cnbc.xml"

[sec]
current_feed = "https://example.com/sec.atom"

[fallback]
markets = [{ name = "MW", url = "https://example.com/mw.xml" }]

[news_api]
api_key = "abc"
tickers = ["aapl", "msft", "nvda", " ", "amzn"]
max_symbols = 2
"#,
        )
        .unwrap();
        assert_eq!(cfg.rss.len(), 1);
        assert_eq!(cfg.fallback.markets[0].name, "MW");
        assert!(cfg.fallback.companies.is_empty());
        assert_eq!(cfg.news_api.key().as_deref(), Some("abc"));
        assert_eq!(cfg.news_api.capped_tickers(), vec!["AAPL", "MSFT"]);
        assert_eq!(cfg.timeout_secs, 20);
    }

    #[test]
    fn blank_key_disables_api() {
        let cfg = SourcesConfig::from_toml_str("[news_api]\napi_key = \"\"\n").unwrap();
        assert!(cfg.news_api.key().is_none());
    }
}
