//! Topic sets used as classification context and state partition key.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Built-in topic groups that expand into several keywords
pub const DEFAULT_TOPIC_GROUPS: &[(&str, &[&str])] = &[
    ("ML", &["machine learning", "deep learning", "natural language processing"]),
    ("CV", &["computer vision", "image processing", "object detection"]),
    ("SE", &["software engineering", "programming languages", "software testing"]),
    ("DS", &["data science", "big data", "data visualization"]),
    ("DB", &["database systems", "data management", "data mining"]),
    ("AI", &["artificial intelligence", "expert systems", "knowledge representation"]),
    ("HCI", &["human-computer interaction", "user experience", "user interface design"]),
    ("CC", &["cloud computing", "distributed systems", "networking"]),
    ("SEC", &["cybersecurity", "information security", "cryptography"]),
    ("WEB", &["web development", "web design", "web applications"]),
    ("IOT", &["internet of things", "smart devices", "sensor networks"]),
    ("DBG", &["debugging", "fault localization", "breakpoints", "stack trace"]),
    ("TST", &["testing", "test automation", "test case generation", "test coverage"]),
];

/// Named topic groups, keyed by group name
pub type TopicGroups = BTreeMap<String, Vec<String>>;

/// The built-in groups as an owned map
pub fn default_topic_groups() -> TopicGroups {
    DEFAULT_TOPIC_GROUPS
        .iter()
        .map(|(name, topics)| {
            (
                name.to_string(),
                topics.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

/// An ordered set of topic keywords.
///
/// Order is preserved for prompts and report headers; the [`signature`](Self::signature)
/// is order-independent and is what keys the dedup state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicSet {
    topics: Vec<String>,
}

impl TopicSet {
    /// Build a topic set, dropping blanks and repeated keywords
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let topics = topics
            .into_iter()
            .map(|t| t.into().trim().to_string())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Self { topics }
    }

    /// Expand a comma-separated selection such as `"ML,rust"`.
    ///
    /// Group names are matched exactly; anything else is kept as a literal topic.
    pub fn expand(selection: &str, groups: &TopicGroups) -> Self {
        let mut topics = Vec::new();
        for item in selection.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match groups.get(item) {
                Some(expanded) => topics.extend(expanded.iter().cloned()),
                None => topics.push(item.to_string()),
            }
        }
        Self::new(topics)
    }

    /// Canonical state key: sorted, deduplicated, joined with `_`
    pub fn signature(&self) -> String {
        let sorted: BTreeSet<String> = self
            .topics
            .iter()
            .map(|t| t.replace(['/', '\\'], "-"))
            .collect();
        sorted.into_iter().collect::<Vec<_>>().join("_")
    }

    /// Topics in caller order
    pub fn as_slice(&self) -> &[String] {
        &self.topics
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.topics.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }
}

impl std::fmt::Display for TopicSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.topics.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_order_independent() {
        let a = TopicSet::new(["testing", "debugging"]);
        let b = TopicSet::new(["debugging", "testing", "debugging"]);
        assert_eq!(a.signature(), "debugging_testing");
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_signature_is_a_single_path_component() {
        let topics = TopicSet::new(["input/output", "a\\b"]);
        assert!(!topics.signature().contains('/'));
        assert!(!topics.signature().contains('\\'));
    }

    #[test]
    fn test_expand_groups() {
        let groups = default_topic_groups();
        let topics = TopicSet::expand("DBG, rust", &groups);
        assert_eq!(
            topics.as_slice(),
            &[
                "debugging",
                "fault localization",
                "breakpoints",
                "stack trace",
                "rust"
            ]
        );
    }

    #[test]
    fn test_expand_unknown_group_is_literal() {
        let topics = TopicSet::expand("quantum computing", &TopicGroups::new());
        assert_eq!(topics.as_slice(), &["quantum computing"]);
    }

    #[test]
    fn test_blank_topics_dropped() {
        let topics = TopicSet::expand(" , ,ML", &default_topic_groups());
        assert_eq!(topics.len(), 3);
    }
}
