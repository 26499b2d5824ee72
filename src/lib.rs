//! # arXiv Digest
//!
//! Reads the daily arXiv RSS listing, asks a language model which new papers
//! are relevant to a set of topics, optionally summarizes their full text,
//! and writes a Markdown digest.
//!
//! ## Architecture
//!
//! - [`feed`]: RSS snapshot sources
//! - [`state`]: per-topic record of already processed papers
//! - [`llm`]: chat-completions providers (local Ollama or hosted OpenAI)
//! - [`gateway`]: retry-wrapped classification and summarization
//! - [`acquire`]: PDF download and text extraction
//! - [`pipeline`]: the per-entry orchestration loop
//! - [`report`]: Markdown and JSON rendering
//! - [`config`]: layered configuration
//! - [`models`]: feed entries, paper records, topic sets
//! - [`utils`]: HTTP client, retry, progress

pub mod acquire;
pub mod config;
pub mod feed;
pub mod gateway;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod state;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{FeedEntry, PaperRecord, TopicSet};
pub use pipeline::{Pipeline, PipelineOptions, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
