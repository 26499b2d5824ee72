//! Run orchestration: feed -> skip rules -> classify -> enrich -> accumulate -> report.
//!
//! Entries are handled strictly one after another. Every model and network
//! call is awaited before the next entry starts.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::acquire::{DocumentAcquirer, ScratchDir};
use crate::feed::{FeedError, FeedSource};
use crate::gateway::{ClassificationGateway, SummarizationGateway};
use crate::models::{AnchorAllocator, FeedEntry, PaperRecord, TopicSet};
use crate::report::{DateRange, Destination, Report, ReportError};
use crate::state::{DedupStore, ProcessedIdSet, StateError};
use crate::utils::ProgressReporter;

/// Fatal run errors; everything per-paper is handled inside the loop
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Full-text summaries: acquisition and the summarizer always travel together
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub acquirer: DocumentAcquirer,
    pub summarizer: SummarizationGateway,
}

/// Run switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Ignore and do not update dedup state
    pub show_all: bool,
    /// Save the processed set at the end of the run
    pub persistent: bool,
    /// Stop after this many included papers
    pub max_entries: Option<usize>,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            show_all: false,
            persistent: true,
            max_entries: None,
            show_progress: false,
        }
    }
}

/// What happened to each entry of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Entries in the feed snapshot
    pub entries: usize,
    /// Skipped as already processed or replaced
    pub skipped: usize,
    /// Sent to the classifier
    pub examined: usize,
    /// Appended to the report
    pub included: usize,
    /// Classified relevant but dropped for lack of a summary
    pub dropped: usize,
}

/// In-memory result of the per-entry loop
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub papers: Vec<PaperRecord>,
    /// Identifiers visited this run; empty in show-all mode
    pub processed: ProcessedIdSet,
    pub examined_dates: Vec<DateTime<Utc>>,
    pub stats: RunStats,
}

/// Returned to the caller once the report is written
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: RunStats,
    pub date_range: DateRange,
    /// Report location; `None` when written to stdout
    pub report: Option<PathBuf>,
    pub state_saved: bool,
}

enum Verdict {
    Old,
    Yes,
    No,
}

impl Verdict {
    fn label(&self) -> &'static str {
        match self {
            Verdict::Old => "old",
            Verdict::Yes => "yes",
            Verdict::No => "no ",
        }
    }
}

/// The orchestrator
#[derive(Debug, Clone)]
pub struct Pipeline {
    classifier: ClassificationGateway,
    enrichment: Option<Enrichment>,
    scratch: Option<ScratchDir>,
    store: DedupStore,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(classifier: ClassificationGateway, store: DedupStore) -> Self {
        Self {
            classifier,
            enrichment: None,
            scratch: None,
            store,
            options: PipelineOptions::default(),
        }
    }

    /// Summarize included papers; papers without a summary are then dropped
    pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
        if self.scratch.is_none() {
            self.scratch = Some(enrichment.acquirer.scratch().clone());
        }
        self.enrichment = Some(enrichment);
        self
    }

    /// Scratch directory removed at the end of every run, summaries or not
    pub fn with_scratch(mut self, scratch: ScratchDir) -> Self {
        self.scratch = Some(scratch);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn include_summaries(&self) -> bool {
        self.enrichment.is_some()
    }

    /// Apply the per-entry rules to a feed snapshot
    pub async fn process(
        &self,
        entries: &[FeedEntry],
        topics: &TopicSet,
        prior: &ProcessedIdSet,
        progress: &ProgressReporter,
    ) -> Outcome {
        let total = entries.len();
        let mut outcome = Outcome {
            stats: RunStats {
                entries: total,
                ..RunStats::default()
            },
            ..Outcome::default()
        };
        let mut anchors = AnchorAllocator::new();

        for (i, entry) in entries.iter().enumerate() {
            progress.set_message(&entry.title);

            if !self.options.show_all {
                outcome.processed.insert(entry.id.clone());
                if prior.contains(&entry.id) || entry.announce_type.is_replacement() {
                    outcome.stats.skipped += 1;
                    log_verdict(i + 1, total, Verdict::Old, &entry.title);
                    progress.inc();
                    continue;
                }
            }

            outcome.stats.examined += 1;
            outcome.examined_dates.push(entry.published);

            let relevant = self
                .classifier
                .classify(&entry.title, &entry.r#abstract, topics)
                .await;
            log_verdict(
                i + 1,
                total,
                if relevant { Verdict::Yes } else { Verdict::No },
                &entry.title,
            );
            if !relevant {
                progress.inc();
                continue;
            }

            let summary = match &self.enrichment {
                Some(enrichment) => match enrich(enrichment, entry).await {
                    Some(summary) => Some(summary),
                    None => {
                        tracing::warn!("Dropping {} ({}): no summary available", entry.id, entry.title);
                        outcome.stats.dropped += 1;
                        progress.inc();
                        continue;
                    }
                },
                None => None,
            };

            let target = anchors.allocate(&entry.title);
            outcome
                .papers
                .push(PaperRecord::from_entry(entry, summary, target));
            outcome.stats.included += 1;
            progress.inc();

            if let Some(cap) = self.options.max_entries {
                if outcome.stats.included >= cap {
                    tracing::info!("Reached the limit of {} papers", cap);
                    break;
                }
            }
        }

        outcome
    }

    /// One full run against a feed source
    pub async fn run(
        &self,
        source: &dyn FeedSource,
        topics: &TopicSet,
        destination: &Destination,
        include_json: bool,
    ) -> Result<RunSummary, PipelineError> {
        tracing::info!("Fetching feed from {}", source.location());
        let snapshot = source.fetch().await?;

        let prior = if self.options.show_all {
            ProcessedIdSet::new()
        } else {
            self.store.load(topics)?
        };
        tracing::info!(
            "Analyzing {} papers for [{}] ({} already processed)",
            snapshot.len(),
            topics,
            prior.len()
        );

        let progress = if self.options.show_progress {
            ProgressReporter::new(snapshot.len())
        } else {
            ProgressReporter::quiet(snapshot.len())
        };
        let outcome = self.process(&snapshot.entries, topics, &prior, &progress).await;
        progress.finish();

        let result = self.finalize(outcome, topics, destination, include_json);
        self.clear_scratch();
        result
    }

    fn finalize(
        &self,
        outcome: Outcome,
        topics: &TopicSet,
        destination: &Destination,
        include_json: bool,
    ) -> Result<RunSummary, PipelineError> {
        let state_saved = self.options.persistent && !self.options.show_all;
        if state_saved {
            self.store.save(&outcome.processed, topics)?;
        }

        let date_range = DateRange::from_dates(outcome.examined_dates.iter().copied());
        let report = Report::new(
            outcome.papers,
            date_range,
            topics.clone(),
            self.include_summaries(),
        )
        .render(destination, include_json)?;

        tracing::info!(
            "{} of {} papers included ({} skipped, {} dropped)",
            outcome.stats.included,
            outcome.stats.entries,
            outcome.stats.skipped,
            outcome.stats.dropped
        );

        Ok(RunSummary {
            stats: outcome.stats,
            date_range,
            report,
            state_saved,
        })
    }

    fn clear_scratch(&self) {
        let mut dirs: Vec<&ScratchDir> = self.scratch.iter().collect();
        if let Some(enrichment) = &self.enrichment {
            let own = enrichment.acquirer.scratch();
            if !dirs.iter().any(|dir| dir.path() == own.path()) {
                dirs.push(own);
            }
        }
        for scratch in dirs {
            if let Err(e) = scratch.clear() {
                tracing::warn!(
                    "Failed to remove scratch directory {}: {}",
                    scratch.path().display(),
                    e
                );
            }
        }
    }
}

async fn enrich(enrichment: &Enrichment, entry: &FeedEntry) -> Option<String> {
    let text = enrichment.acquirer.acquire(&entry.id, &entry.link).await?;
    enrichment.summarizer.summarize(&text).await
}

fn log_verdict(index: usize, total: usize, verdict: Verdict, title: &str) {
    tracing::info!("{}/{}> {}: {}", index, total, verdict.label(), title);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatCapability, LlmError};
    use crate::models::AnnounceType;
    use crate::utils::RetryConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers "Yes" for titles containing the keyword, "No" otherwise
    struct KeywordModel {
        keyword: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatCapability for KeywordModel {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(if prompt.contains(self.keyword) { "Yes" } else { "No" }.to_string())
        }
    }

    fn model(keyword: &'static str) -> Arc<KeywordModel> {
        Arc::new(KeywordModel {
            keyword,
            calls: AtomicUsize::new(0),
        })
    }

    fn pipeline(model: Arc<KeywordModel>, dir: &std::path::Path) -> Pipeline {
        let classifier = ClassificationGateway::new(model, RetryConfig::default().no_delay());
        Pipeline::new(classifier, DedupStore::new(dir))
    }

    fn entry(id: &str, title: &str) -> FeedEntry {
        FeedEntry::new(id, title, format!("https://arxiv.org/abs/{}", id))
    }

    fn ids(items: &[&str]) -> ProcessedIdSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_skip_rules() {
        let dir = tempfile::tempdir().unwrap();
        let model = model("Deep");
        let entries = vec![
            entry("A1", "Deep One"),
            entry("A2", "Deep Two").announce_type(AnnounceType::Replace),
            entry("A3", "Deep Three"),
            entry("A4", "Shallow"),
        ];

        let outcome = pipeline(model.clone(), dir.path())
            .process(
                &entries,
                &TopicSet::new(["x"]),
                &ids(&["A1"]),
                &ProgressReporter::quiet(entries.len()),
            )
            .await;

        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.processed, ids(&["A1", "A2", "A3", "A4"]));
        assert_eq!(outcome.papers.len(), 1);
        assert_eq!(outcome.papers[0].paper_id, "A3");
        assert_eq!(
            outcome.stats,
            RunStats {
                entries: 4,
                skipped: 2,
                examined: 2,
                included: 1,
                dropped: 0,
            }
        );
        assert_eq!(outcome.examined_dates.len(), 2);
    }

    #[tokio::test]
    async fn test_show_all_ignores_history() {
        let dir = tempfile::tempdir().unwrap();
        let model = model("Deep");
        let entries = vec![
            entry("A1", "Deep One"),
            entry("A2", "Deep Two").announce_type(AnnounceType::ReplaceCross),
        ];

        let outcome = pipeline(model.clone(), dir.path())
            .with_options(PipelineOptions {
                show_all: true,
                ..PipelineOptions::default()
            })
            .process(&entries, &TopicSet::new(["x"]), &ids(&["A1"]), &ProgressReporter::quiet(2))
            .await;

        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.papers.len(), 2);
        assert!(outcome.processed.is_empty());
    }

    #[tokio::test]
    async fn test_cap_stops_marking() {
        let dir = tempfile::tempdir().unwrap();
        let model = model("Deep");
        let entries = vec![
            entry("A1", "Deep One"),
            entry("A2", "Deep Two"),
            entry("A3", "Deep Three"),
        ];

        let outcome = pipeline(model.clone(), dir.path())
            .with_options(PipelineOptions {
                max_entries: Some(1),
                ..PipelineOptions::default()
            })
            .process(&entries, &TopicSet::new(["x"]), &ProcessedIdSet::new(), &ProgressReporter::quiet(3))
            .await;

        assert_eq!(outcome.papers.len(), 1);
        assert_eq!(outcome.processed, ids(&["A1"]));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_colliding_titles_get_distinct_anchors() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![entry("A1", "Deep Nets"), entry("A2", "Deep Nets!")];

        let outcome = pipeline(model("Deep"), dir.path())
            .process(&entries, &TopicSet::new(["x"]), &ProcessedIdSet::new(), &ProgressReporter::quiet(2))
            .await;

        let targets: Vec<&str> = outcome.papers.iter().map(|p| p.target.as_str()).collect();
        assert_eq!(targets, vec!["deep-nets", "deep-nets-2"]);
    }
}
