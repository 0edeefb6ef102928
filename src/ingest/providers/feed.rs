// src/ingest/providers/feed.rs
//! RSS 2.0 / Atom feed provider.
//!
//! Fixture mode parses an in-memory document (tests, offline runs); HTTP mode
//! fetches the document with a shared `reqwest::Client`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::{OriginKind, RawEntry, SourceProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "date", alias = "dc:date")]
    dc_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: Option<String>,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

impl AtomEntry {
    fn best_link(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .and_then(|l| l.href.clone())
    }
}

/// Parse feed timestamps: RFC 2822 (RSS) or RFC 3339 (Atom), named zones tolerated.
pub fn parse_feed_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    // chrono first: it understands the obsolete named zones (GMT, EST, PDT...) feeds still emit
    if let Ok(dt) = DateTime::parse_from_rfc2822(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    OffsetDateTime::parse(ts, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc2822))
        .ok()
        .and_then(|dt| Utc.timestamp_opt(dt.unix_timestamp(), 0).single())
}

pub struct FeedProvider {
    name: String,
    origin: OriginKind,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl FeedProvider {
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            origin: OriginKind::News,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(name: &str, url: &str, client: reqwest::Client) -> Self {
        Self {
            name: name.to_string(),
            origin: OriginKind::News,
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }

    /// Mark every entry of this feed as a regulatory filing.
    pub fn filings(mut self) -> Self {
        self.origin = OriginKind::Filing;
        self
    }

    pub fn parse_entries(&self, s: &str) -> Result<Vec<RawEntry>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);

        let out = if looks_like_atom(&xml_clean) {
            let feed: AtomFeed = from_str(&xml_clean)
                .with_context(|| format!("parsing atom feed `{}`", self.name))?;
            feed.entry
                .into_iter()
                .map(|e| {
                    let link = e.best_link();
                    RawEntry {
                        source: Some(self.name.clone()),
                        title: e.title.map(|t| t.value),
                        link,
                        summary: e.summary.or(e.content).map(|t| t.value),
                        published: e.published.as_deref().and_then(parse_feed_timestamp),
                        updated: e.updated.as_deref().and_then(parse_feed_timestamp),
                        origin: self.origin,
                    }
                })
                .collect::<Vec<_>>()
        } else if xml_clean.contains("<rss") {
            let rss: Rss = from_str(&xml_clean)
                .with_context(|| format!("parsing rss feed `{}`", self.name))?;
            rss.channel
                .item
                .into_iter()
                .map(|it| RawEntry {
                    source: Some(self.name.clone()),
                    title: it.title,
                    link: it.link,
                    summary: it.description,
                    published: it.pub_date.as_deref().and_then(parse_feed_timestamp),
                    updated: it.dc_date.as_deref().and_then(parse_feed_timestamp),
                    origin: self.origin,
                })
                .collect::<Vec<_>>()
        } else {
            return Err(anyhow!("feed `{}` is neither RSS nor Atom", self.name));
        };

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("digest_feed_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for FeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawEntry>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_entries(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?
                    .error_for_status()
                    .with_context(|| format!("status from {url}"))?
                    .text()
                    .await
                    .context("feed body .text()")?;
                self.parse_entries(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn looks_like_atom(s: &str) -> bool {
    !s.contains("<rss") && s.contains("<feed")
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
