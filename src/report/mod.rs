//! Digest rendering: Markdown document plus optional JSON export.
//!
//! # Destinations
//!
//! - `--` writes the document to stdout (no JSON export)
//! - an explicit path is written (and overwritten) as given
//! - otherwise a name is derived from the topic signature and date range,
//!   `arxiv_summary_<signature>_<range>.md`, with `-1`, `-2`, ... appended
//!   until the name is free

mod markdown;

pub use markdown::write_markdown;

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use crate::models::{PaperRecord, TopicSet};

/// Value of `--out` that selects standard output
pub const STDOUT_SENTINEL: &str = "--";

/// Label used when no entry was examined
pub const NO_PAPERS_LABEL: &str = "No new papers examined";

const NO_PAPERS_FILE_LABEL: &str = "no-new-papers";

/// Errors that can occur while writing the report
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to write report to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to write report to stdout: {0}")]
    Stdout(io::Error),

    #[error("Failed to serialize papers: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where the report goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
    /// Derived file name inside the given directory
    Auto(PathBuf),
}

impl Destination {
    /// Interpret an `--out` value; absent means an automatic name in the working directory
    pub fn parse(out: Option<&str>) -> Self {
        match out {
            Some(STDOUT_SENTINEL) => Destination::Stdout,
            Some(path) if !path.is_empty() => Destination::File(PathBuf::from(path)),
            _ => Destination::Auto(PathBuf::from(".")),
        }
    }
}

/// Span of publication times over the examined entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    bounds: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl DateRange {
    pub fn from_dates<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let bounds = dates.into_iter().fold(None, |acc, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        });
        Self { bounds }
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.bounds
    }

    /// Human-readable form used in the report header
    pub fn label(&self) -> String {
        match self.bounds {
            Some((lo, hi)) => format!(
                "{} to {}",
                lo.format("%Y-%m-%d %H:%M:%S"),
                hi.format("%Y-%m-%d %H:%M:%S")
            ),
            None => NO_PAPERS_LABEL.to_string(),
        }
    }

    /// Form safe to embed in a file name
    pub fn file_label(&self) -> String {
        match self.bounds {
            Some((lo, hi)) => format!("{}_to_{}", lo.format("%Y-%m-%d"), hi.format("%Y-%m-%d")),
            None => NO_PAPERS_FILE_LABEL.to_string(),
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// First free `arxiv_summary_<signature>_<range>[-N].md` in `dir`
pub fn report_file_name(dir: &Path, topics: &TopicSet, range: &DateRange) -> PathBuf {
    let stem = format!("arxiv_summary_{}_{}", topics.signature(), range.file_label());
    let mut candidate = dir.join(format!("{}.md", stem));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}-{}.md", stem, n));
        n += 1;
    }
    candidate
}

/// Everything the renderer needs for one run
#[derive(Debug, Clone)]
pub struct Report {
    pub papers: Vec<PaperRecord>,
    pub date_range: DateRange,
    pub topics: TopicSet,
    pub include_summaries: bool,
    pub generated_on: NaiveDate,
}

impl Report {
    pub fn new(
        papers: Vec<PaperRecord>,
        date_range: DateRange,
        topics: TopicSet,
        include_summaries: bool,
    ) -> Self {
        Self {
            papers,
            date_range,
            topics,
            include_summaries,
            generated_on: Local::now().date_naive(),
        }
    }

    /// Override the date stamped in the header
    pub fn generated_on(mut self, date: NaiveDate) -> Self {
        self.generated_on = date;
        self
    }

    /// Render to `destination`. Returns the document path when a file was written.
    pub fn render(
        &self,
        destination: &Destination,
        include_json: bool,
    ) -> Result<Option<PathBuf>, ReportError> {
        let path = match destination {
            Destination::Stdout => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                write_markdown(&mut out, self).map_err(ReportError::Stdout)?;
                return Ok(None);
            }
            Destination::File(path) => path.clone(),
            Destination::Auto(dir) => report_file_name(dir, &self.topics, &self.date_range),
        };

        self.write_file(&path)?;
        tracing::info!("Report written to {}", path.display());

        if include_json {
            let json_path = json_export_path(&path);
            self.write_json(&json_path)?;
            tracing::info!("JSON export written to {}", json_path.display());
        }

        Ok(Some(path))
    }

    fn write_file(&self, path: &Path) -> Result<(), ReportError> {
        let write_err = |source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let file = File::create(path).map_err(write_err)?;
        let mut out = BufWriter::new(file);
        write_markdown(&mut out, self).map_err(write_err)
    }

    fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(&self.papers)?;
        fs::write(path, json).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Sibling `.json` path for the export. A report already named `*.json`
/// gets the suffix appended so the export never replaces the document.
pub fn json_export_path(report: &Path) -> PathBuf {
    let is_json = report
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let mut name = report.as_os_str().to_os_string();
        name.push(".json");
        PathBuf::from(name)
    } else {
        report.with_extension("json")
    }
}
