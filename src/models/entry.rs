//! Feed entry model representing one announcement from the arXiv feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker that prefixes every replacement announcement type
const REPLACE_PREFIX: &str = "replace";

/// How arXiv announced an entry in the daily feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnounceType {
    /// First announcement of a new submission
    #[default]
    New,
    /// Cross-listed from another category
    Cross,
    /// New version of a previously announced paper
    Replace,
    /// New version of a previously cross-listed paper
    ReplaceCross,
    #[serde(untagged)]
    Other(String),
}

impl AnnounceType {
    /// Parse the raw `Announce Type` tag from the feed
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "new" => AnnounceType::New,
            "cross" => AnnounceType::Cross,
            "replace" => AnnounceType::Replace,
            "replace-cross" => AnnounceType::ReplaceCross,
            other => AnnounceType::Other(other.to_string()),
        }
    }

    /// The tag as it appears in the feed
    pub fn as_str(&self) -> &str {
        match self {
            AnnounceType::New => "new",
            AnnounceType::Cross => "cross",
            AnnounceType::Replace => "replace",
            AnnounceType::ReplaceCross => "replace-cross",
            AnnounceType::Other(s) => s,
        }
    }

    /// Whether this announcement replaces an earlier submission.
    ///
    /// This is a prefix match on the raw tag, so unknown `replace*` variants
    /// are treated as replacements too.
    pub fn is_replacement(&self) -> bool {
        self.as_str().starts_with(REPLACE_PREFIX)
    }
}

impl std::fmt::Display for AnnounceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One paper announcement from a feed snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// arXiv identifier, unique within a snapshot (e.g. "2501.01234v1")
    pub id: String,

    /// Paper title
    pub title: String,

    /// Paper abstract
    pub r#abstract: String,

    /// Publication timestamp
    pub published: DateTime<Utc>,

    /// Abstract page URL
    pub link: String,

    /// Announcement type
    pub announce_type: AnnounceType,
}

impl FeedEntry {
    /// Create a new entry with required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            r#abstract: String::new(),
            published: Utc::now(),
            link: link.into(),
            announce_type: AnnounceType::New,
        }
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.r#abstract = abstract_text.into();
        self
    }

    /// Set publication timestamp
    pub fn published(mut self, published: DateTime<Utc>) -> Self {
        self.published = published;
        self
    }

    /// Set announcement type
    pub fn announce_type(mut self, announce_type: AnnounceType) -> Self {
        self.announce_type = announce_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announce_type_parse() {
        assert_eq!(AnnounceType::parse("new"), AnnounceType::New);
        assert_eq!(AnnounceType::parse(" Cross "), AnnounceType::Cross);
        assert_eq!(AnnounceType::parse("replace"), AnnounceType::Replace);
        assert_eq!(AnnounceType::parse("replace-cross"), AnnounceType::ReplaceCross);
        assert_eq!(
            AnnounceType::parse("withdrawn"),
            AnnounceType::Other("withdrawn".to_string())
        );
    }

    #[test]
    fn test_is_replacement() {
        assert!(AnnounceType::Replace.is_replacement());
        assert!(AnnounceType::ReplaceCross.is_replacement());
        assert!(AnnounceType::parse("replace-something-else").is_replacement());
        assert!(!AnnounceType::New.is_replacement());
        assert!(!AnnounceType::Cross.is_replacement());
    }

    #[test]
    fn test_entry_builder() {
        let entry = FeedEntry::new("2501.00001v1", "A Title", "https://arxiv.org/abs/2501.00001")
            .abstract_text("Some abstract")
            .announce_type(AnnounceType::Replace);

        assert_eq!(entry.id, "2501.00001v1");
        assert_eq!(entry.r#abstract, "Some abstract");
        assert!(entry.announce_type.is_replacement());
    }
}
