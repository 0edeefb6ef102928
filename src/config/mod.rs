// src/config/mod.rs
//! Configuration value objects, built once in `main` and passed by reference.

pub mod ai;
pub mod digest;
pub mod sources;

pub use ai::AiConfig;
pub use digest::{
    DigestConfig, DisplayConfig, EmailConfig, FilterConfig, Recipients, WindowConfig, MAX_WINDOW_DAYS,
};
pub use sources::{FeedSpec, NewsApiConfig, SourcesConfig};

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Resolve a config path: explicit CLI path, then env var, then the default.
/// The bool says whether the path was asked for explicitly (and so must exist).
pub(crate) fn resolve_path(cli: Option<&Path>, env_var: &str, default: &str) -> (PathBuf, bool) {
    if let Some(p) = cli {
        return (p.to_path_buf(), true);
    }
    if let Ok(p) = std::env::var(env_var) {
        if !p.trim().is_empty() {
            return (PathBuf::from(p), true);
        }
    }
    (PathBuf::from(default), false)
}

/// Read a file that may legitimately be absent when not explicitly requested.
pub(crate) fn read_optional(path: &Path, explicit: bool) -> Result<Option<String>> {
    if !path.exists() {
        if explicit {
            return Err(anyhow!("config path {} does not exist", path.display()));
        }
        tracing::info!(path = %path.display(), "config file absent, using defaults");
        return Ok(None);
    }
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    Ok(Some(s))
}

/// Trim entries, drop empties and duplicates, keep first-seen order.
pub(crate) fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

/// `"ENV"` (any case) means: read the secret from `env_var`. Absent → empty.
pub(crate) fn resolve_secret(raw: &str, env_var: &str) -> String {
    if raw.trim().eq_ignore_ascii_case("env") {
        std::env::var(env_var).unwrap_or_default().trim().to_string()
    } else {
        raw.trim().to_string()
    }
}
