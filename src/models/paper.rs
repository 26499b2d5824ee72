//! Paper record model accumulated for the report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::FeedEntry;

/// A paper included in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// arXiv identifier
    pub paper_id: String,

    /// Paper title
    pub title: String,

    /// Paper abstract
    pub r#abstract: String,

    /// Abstract page URL
    pub link: String,

    /// Publication timestamp
    pub published: DateTime<Utc>,

    /// Classification outcome
    pub analysis: bool,

    /// Full-text summary, empty when summaries were not requested
    #[serde(default)]
    pub summary: String,

    /// In-document anchor
    pub target: String,
}

impl PaperRecord {
    /// Build a record from a classified entry, with its anchor already assigned
    pub fn from_entry(entry: &FeedEntry, summary: Option<String>, target: String) -> Self {
        Self {
            paper_id: entry.id.clone(),
            title: entry.title.clone(),
            r#abstract: entry.r#abstract.clone(),
            link: entry.link.clone(),
            published: entry.published,
            analysis: true,
            summary: summary.unwrap_or_default(),
            target,
        }
    }

    pub fn has_summary(&self) -> bool {
        !self.summary.is_empty()
    }
}

/// Normalize a title into an anchor slug.
///
/// Lowercases, turns spaces into hyphens and drops everything outside `[a-z-]`.
pub fn anchor_slug(title: &str) -> String {
    title
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || *c == '-')
        .collect()
}

/// Hands out unique anchors within one report.
///
/// The first title to produce a slug keeps it; later collisions get `-2`, `-3`, ...
#[derive(Debug, Default)]
pub struct AnchorAllocator {
    used: HashSet<String>,
}

impl AnchorAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an anchor for `title`
    pub fn allocate(&mut self, title: &str) -> String {
        let base = anchor_slug(title);
        if self.used.insert(base.clone()) {
            return base;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
