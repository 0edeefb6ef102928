// src/config/digest.rs
use anyhow::Result;
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

use super::{clean_list, read_optional, resolve_path};

pub const DEFAULT_DIGEST_CONFIG_PATH: &str = "config/digest.toml";
pub const ENV_DIGEST_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";

pub const DEFAULT_WINDOW_DAYS: i64 = 7;
/// Upper bound for `window.days`; larger values would overflow date arithmetic.
pub const MAX_WINDOW_DAYS: i64 = 3650;
pub const DEFAULT_MIN_RELEVANCE: u32 = 2;
pub const DEFAULT_PER_SECTION: usize = 3;
/// America/Phoenix: no DST, so a fixed offset is exact.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -7;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub window: WindowConfig,
    pub filters: FilterConfig,
    pub display: DisplayConfig,
    pub email: EmailConfig,
    pub recipients: Recipients,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub days: i64,
    pub utc_offset_hours: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            days: DEFAULT_WINDOW_DAYS,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

impl WindowConfig {
    pub fn tz(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_relevance: u32,
    pub negative_terms: Vec<String>,
    pub drop_if_url_path_contains: Vec<String>,
    pub allowed_sources: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_relevance: DEFAULT_MIN_RELEVANCE,
            negative_terms: Vec::new(),
            drop_if_url_path_contains: Vec::new(),
            allowed_sources: Vec::new(),
        }
    }
}

impl FilterConfig {
    /// Threshold used by the relaxed pass: one below strict, never below 1.
    pub fn relaxed_min_relevance(&self) -> u32 {
        self.min_relevance.saturating_sub(1).max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub per_section: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            per_section: DEFAULT_PER_SECTION,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub subject_prefix: String,
    pub from_name: String,
    pub reply_to: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            subject_prefix: "[Weekly Finance Brief]".to_string(),
            from_name: "Finance Brief Bot".to_string(),
            reply_to: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Recipients {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl DigestConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: DigestConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    /// `--config` path, then `$DIGEST_CONFIG_PATH`, then `config/digest.toml`.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let (path, explicit) =
            resolve_path(cli_path, ENV_DIGEST_CONFIG_PATH, DEFAULT_DIGEST_CONFIG_PATH);
        match read_optional(&path, explicit)? {
            Some(s) => Self::from_toml_str(&s),
            None => Ok(Self::default()),
        }
    }

    fn sanitized(mut self) -> Self {
        if self.window.days < 1 {
            self.window.days = DEFAULT_WINDOW_DAYS;
        } else if self.window.days > MAX_WINDOW_DAYS {
            warn!(days = self.window.days, max = MAX_WINDOW_DAYS, "window.days clamped");
            self.window.days = MAX_WINDOW_DAYS;
        }
        if !(-12..=14).contains(&self.window.utc_offset_hours) {
            self.window.utc_offset_hours = DEFAULT_UTC_OFFSET_HOURS;
        }
        if self.filters.min_relevance < 1 {
            self.filters.min_relevance = 1;
        }
        if self.display.per_section < 1 {
            self.display.per_section = DEFAULT_PER_SECTION;
        }
        self.filters.negative_terms = clean_list(self.filters.negative_terms);
        self.filters.drop_if_url_path_contains =
            clean_list(self.filters.drop_if_url_path_contains);
        self.filters.allowed_sources = clean_list(self.filters.allowed_sources);
        self.recipients.to = clean_list(self.recipients.to);
        self.recipients.cc = clean_list(self.recipients.cc);
        self.recipients.bcc = clean_list(self.recipients.bcc);
        self.email.reply_to = self.email.reply_to.filter(|r| !r.trim().is_empty());
        self
    }
}
