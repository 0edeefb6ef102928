// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};

/// Timestamps carried by normalized items: one fixed offset for the whole run.
pub type Timestamp = DateTime<FixedOffset>;

/// Source label used when an origin does not name itself.
pub const DEFAULT_SOURCE_LABEL: &str = "News";

/// Length of the case-folded title prefix used as identity.
pub const KEY_TITLE_PREFIX: usize = 140;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    /// General news (RSS/Atom feeds, news API).
    News,
    /// Regulatory filing feed; always company-specific.
    Filing,
    /// Synthetic stand-in for an empty bucket.
    Placeholder,
}

/// What a provider hands back before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub source: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub origin: OriginKind,
}

impl RawEntry {
    pub fn news(source: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            title: None,
            link: None,
            summary: None,
            published: None,
            updated: None,
            origin: OriginKind::News,
        }
    }
}

/// A normalized story record.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Item {
    pub source: String,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub published: Option<Timestamp>,
    pub origin_kind: OriginKind,
}

/// Stable identity: case-folded title prefix + source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub title_prefix: String,
    pub source: String,
}

impl Item {
    pub fn key(&self) -> ItemKey {
        let prefix: String = self.title.chars().take(KEY_TITLE_PREFIX).collect();
        ItemKey {
            title_prefix: prefix.to_lowercase(),
            source: self.source.clone(),
        }
    }

    /// Title and summary joined, as scored by the relevance vocabulary.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin_kind == OriginKind::Placeholder
    }
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawEntry>>;
    fn name(&self) -> &str;
}
