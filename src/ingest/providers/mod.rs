// src/ingest/providers/mod.rs
pub mod feed;
pub mod finnhub;

pub use feed::FeedProvider;
pub use finnhub::{FinnhubClient, NewsApi};
