//! Feed sources producing [`FeedEntry`] snapshots.
//!
//! A snapshot is fetched once per run. [`ArxivRssFeed`] reads the live arXiv
//! RSS listing; [`FileFeed`] reads a saved copy from disk, which is what the
//! `--feed <path>` flag and the tests use.

mod arxiv;

pub use arxiv::{parse_feed, parse_description, ArxivRssFeed, DEFAULT_CATEGORY, RSS_BASE_URL};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::models::FeedEntry;
use crate::utils::HttpClient;

/// Errors that can occur while fetching or parsing a feed
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Feed request failed with status {0}")]
    Status(u16),

    #[error("Failed to parse feed: {0}")]
    Parse(String),

    #[error("Failed to read feed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One fetch of a feed: the entries in feed order plus feed-level metadata
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub title: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    pub entries: Vec<FeedEntry>,
}

impl FeedSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A source of feed snapshots
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable location, used in logs
    fn location(&self) -> String;

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError>;
}

/// Reads a feed document from a local file
#[derive(Debug, Clone)]
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileFeed {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FeedError::Io {
                path: self.path.clone(),
                source,
            })?;
        parse_feed(&bytes)
    }
}

/// Pick a source for a `--feed` argument: URLs are fetched, anything else is a file
pub fn source_for(location: &str, http: HttpClient) -> Box<dyn FeedSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(ArxivRssFeed::new(http, location))
    } else {
        Box::new(FileFeed::new(location))
    }
}
