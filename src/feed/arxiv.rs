//! arXiv RSS listing.
//!
//! Items look like:
//!
//! ```text
//! <item>
//!   <title>...</title>
//!   <link>https://arxiv.org/abs/2501.01234</link>
//!   <description>arXiv:2501.01234v1 Announce Type: new
//! Abstract: ...</description>
//!   <guid isPermaLink="false">oai:arXiv.org:2501.01234v1</guid>
//!   <pubDate>Mon, 20 Jan 2025 00:00:00 -0500</pubDate>
//! </item>
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use regex::Regex;
use std::sync::OnceLock;

use super::{FeedError, FeedSnapshot, FeedSource};
use crate::models::{AnnounceType, FeedEntry};
use crate::utils::HttpClient;

/// Base URL of the arXiv RSS service
pub const RSS_BASE_URL: &str = "https://rss.arxiv.org/rss";

/// Category fetched when none is configured
pub const DEFAULT_CATEGORY: &str = "cs";

const ABS_BASE_URL: &str = "https://arxiv.org/abs";

static DESCRIPTION_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn description_re() -> Option<&'static Regex> {
    DESCRIPTION_RE
        .get_or_init(|| {
            Regex::new(r"(?s)^\s*arXiv:\S+\s+Announce Type:\s*(\S+)\s*Abstract:\s*(.*?)\s*$").ok()
        })
        .as_ref()
}

/// The live arXiv RSS feed for one category
#[derive(Debug, Clone)]
pub struct ArxivRssFeed {
    client: HttpClient,
    url: String,
}

impl ArxivRssFeed {
    pub fn new(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Feed for an arXiv category such as `cs` or `cs.LG`
    pub fn for_category(client: HttpClient, category: &str) -> Self {
        Self::new(client, format!("{}/{}", RSS_BASE_URL, category))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for ArxivRssFeed {
    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
        let response = self
            .client
            .client()
            .get(&self.url)
            .header("Accept", "application/rss+xml")
            .send()
            .await
            .map_err(|e| FeedError::Network(format!("Failed to fetch {}: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedError::Network(format!("Failed to read response: {}", e)))?;

        parse_feed(bytes.as_ref())
    }
}

/// Split an arXiv item description into its announce type and abstract.
///
/// Descriptions without the `arXiv:<id> Announce Type:` header are taken as
/// the abstract of a new submission.
pub fn parse_description(description: &str) -> (AnnounceType, String) {
    if let Some(caps) = description_re().and_then(|re| re.captures(description)) {
        let announce = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let text = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        return (AnnounceType::parse(announce), text.to_string());
    }
    (AnnounceType::New, description.trim().to_string())
}

/// Reduce a guid such as `oai:arXiv.org:2501.01234v1` to `2501.01234v1`
fn paper_id(guid: &str) -> &str {
    let guid = guid.trim();
    guid.rsplit(['/', ':']).next().unwrap_or(guid)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an RSS or Atom document into a snapshot
pub fn parse_feed(bytes: &[u8]) -> Result<FeedSnapshot, FeedError> {
    let feed = parser::parse(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;

    let feed_time = feed.updated.or(feed.published);
    let fetched_at = Utc::now();

    let entries = feed
        .entries
        .iter()
        .map(|entry| parse_entry(entry, feed_time.unwrap_or(fetched_at)))
        .collect();

    Ok(FeedSnapshot {
        title: feed.title.map(|t| collapse_whitespace(&t.content)),
        updated: feed_time,
        entries,
    })
}

fn parse_entry(entry: &feed_rs::model::Entry, fallback_time: DateTime<Utc>) -> FeedEntry {
    let id = paper_id(&entry.id).to_string();

    let title = entry
        .title
        .as_ref()
        .map(|t| collapse_whitespace(&t.content))
        .unwrap_or_default();

    let description = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .unwrap_or_default();
    let (announce_type, abstract_text) = parse_description(description);

    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_else(|| format!("{}/{}", ABS_BASE_URL, id));

    let published = entry.published.or(entry.updated).unwrap_or(fallback_time);

    FeedEntry::new(id, title, link)
        .abstract_text(abstract_text)
        .published(published)
        .announce_type(announce_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:arxiv="http://arxiv.org/schemas/atom" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>cs updates on arXiv.org</title>
    <link>http://rss.arxiv.org/rss/cs</link>
    <description>cs updates on the arXiv.org e-print archive.</description>
    <lastBuildDate>Tue, 21 Jan 2025 00:30:00 +0000</lastBuildDate>
    <item>
      <title>Deep Learning for
        Compilers</title>
      <link>https://arxiv.org/abs/2501.01234</link>
      <description>arXiv:2501.01234v1 Announce Type: new
Abstract: We apply deep learning to compiler optimization.</description>
      <guid isPermaLink="false">oai:arXiv.org:2501.01234v1</guid>
      <category>cs.LG</category>
      <pubDate>Mon, 20 Jan 2025 00:00:00 -0500</pubDate>
      <arxiv:announce_type>new</arxiv:announce_type>
    </item>
    <item>
      <title>An Old Result Revisited</title>
      <link>https://arxiv.org/abs/2401.00042</link>
      <description>arXiv:2401.00042v3 Announce Type: replace-cross
Abstract: Revised version.</description>
      <guid isPermaLink="false">oai:arXiv.org:2401.00042v3</guid>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_listing() {
        let snapshot = parse_feed(LISTING.as_bytes()).unwrap();
        assert_eq!(snapshot.title.as_deref(), Some("cs updates on arXiv.org"));
        assert_eq!(snapshot.len(), 2);

        let first = &snapshot.entries[0];
        assert_eq!(first.id, "2501.01234v1");
        assert_eq!(first.title, "Deep Learning for Compilers");
        assert_eq!(first.link, "https://arxiv.org/abs/2501.01234");
        assert_eq!(first.r#abstract, "We apply deep learning to compiler optimization.");
        assert_eq!(first.announce_type, AnnounceType::New);
        assert_eq!(
            first.published,
            Utc.with_ymd_and_hms(2025, 1, 20, 5, 0, 0).unwrap()
        );

        let second = &snapshot.entries[1];
        assert_eq!(second.announce_type, AnnounceType::ReplaceCross);
        assert!(second.announce_type.is_replacement());
    }

    #[test]
    fn test_missing_pub_date_uses_feed_time() {
        let snapshot = parse_feed(LISTING.as_bytes()).unwrap();
        let feed_time = Utc.with_ymd_and_hms(2025, 1, 21, 0, 30, 0).unwrap();
        assert_eq!(snapshot.updated, Some(feed_time));
        assert_eq!(snapshot.entries[1].published, feed_time);
    }

    #[test]
    fn test_parse_description_without_header() {
        let (kind, text) = parse_description("  Plain abstract text. ");
        assert_eq!(kind, AnnounceType::New);
        assert_eq!(text, "Plain abstract text.");
    }

    #[test]
    fn test_parse_description_unknown_type() {
        let (kind, text) =
            parse_description("arXiv:2501.00001v2 Announce Type: withdrawn\nAbstract: Gone.");
        assert_eq!(kind, AnnounceType::Other("withdrawn".to_string()));
        assert_eq!(text, "Gone.");
    }

    #[test]
    fn test_paper_id() {
        assert_eq!(paper_id("oai:arXiv.org:2501.01234v1"), "2501.01234v1");
        assert_eq!(paper_id("http://arxiv.org/abs/2501.01234v2"), "2501.01234v2");
        assert_eq!(paper_id("2501.01234"), "2501.01234");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            parse_feed(b"definitely not xml"),
            Err(FeedError::Parse(_))
        ));
    }

    #[test]
    fn test_for_category() {
        let feed = ArxivRssFeed::for_category(HttpClient::new().unwrap(), "cs.LG");
        assert_eq!(feed.url(), "https://rss.arxiv.org/rss/cs.LG");
    }

    #[tokio::test]
    async fn test_fetch_with_mockito() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/rss/cs")
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(LISTING)
            .create_async()
            .await;

        let feed = ArxivRssFeed::new(
            HttpClient::new().unwrap(),
            format!("{}/rss/cs", server.url()),
        );
        let snapshot = feed.fetch().await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/rss/cs")
            .with_status(503)
            .create_async()
            .await;

        let feed = ArxivRssFeed::new(
            HttpClient::new().unwrap(),
            format!("{}/rss/cs", server.url()),
        );
        assert!(matches!(feed.fetch().await, Err(FeedError::Status(503))));
    }
}
