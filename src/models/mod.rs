//! Core data models for feed entries, topics and report records.

mod entry;
mod paper;
mod topics;

pub use entry::{AnnounceType, FeedEntry};
pub use paper::{anchor_slug, AnchorAllocator, PaperRecord};
pub use topics::{default_topic_groups, TopicGroups, TopicSet, DEFAULT_TOPIC_GROUPS};
