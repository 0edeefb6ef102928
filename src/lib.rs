// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod dedup;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod recency;
pub mod relevance;
pub mod render;
pub mod select;
pub mod summarize;

// ---- Re-exports for stable public API ----
pub use crate::ingest::types::{Item, OriginKind, RawEntry, SourceProvider, Timestamp};
pub use crate::pipeline::{build_digest, Digest};
pub use crate::select::{Bucket, Buckets, Fallbacks, Selection};
