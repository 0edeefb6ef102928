// src/ingest/providers/finnhub.rs
//! Secondary news API (Finnhub-compatible): market-wide news and per-symbol
//! company news scoped by a date range.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::ingest::types::{OriginKind, RawEntry};

pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Contract used by the selection cascade; lets tests plug in a fake.
#[async_trait]
pub trait NewsApi: Send + Sync {
    async fn general_news(&self) -> Result<Vec<RawEntry>>;
    async fn company_news(&self, symbol: &str, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<RawEntry>>;
    fn name(&self) -> &str;
}

/// One record as returned by both endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiArticle {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    /// unix seconds
    #[serde(default)]
    pub datetime: i64,
}

impl From<ApiArticle> for RawEntry {
    fn from(a: ApiArticle) -> Self {
        let published = if a.datetime > 0 {
            Utc.timestamp_opt(a.datetime, 0).single()
        } else {
            None
        };
        RawEntry {
            source: Some(a.source).filter(|s| !s.trim().is_empty()),
            title: Some(a.headline),
            link: Some(a.url),
            summary: Some(a.summary),
            published,
            updated: None,
            origin: OriginKind::News,
        }
    }
}

/// Decode a response body into entries.
pub fn parse_articles(body: &str) -> Result<Vec<RawEntry>> {
    let list: Vec<ApiArticle> = serde_json::from_str(body).context("parsing news api json")?;
    Ok(list.into_iter().map(RawEntry::from).collect())
}

pub struct FinnhubClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<RawEntry>> {
        let url = format!("{}/{}", self.base_url, path);
        let body = self
            .http
            .get(&url)
            .query(query)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("status from {url}"))?
            .text()
            .await
            .context("news api body .text()")?;
        parse_articles(&body)
    }
}

#[async_trait]
impl NewsApi for FinnhubClient {
    async fn general_news(&self) -> Result<Vec<RawEntry>> {
        self.get("news", &[("category", "general")]).await
    }

    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawEntry>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        self.get(
            "company-news",
            &[("symbol", symbol), ("from", from.as_str()), ("to", to.as_str())],
        )
        .await
    }

    fn name(&self) -> &str {
        "Finnhub"
    }
}
