//! Per-topic-set record of already processed paper identifiers.
//!
//! Each topic signature gets its own `analyzed_papers_<signature>.json`, a
//! JSON array of identifiers. Writes go through a temporary file in the same
//! directory and are renamed into place.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::models::TopicSet;

/// Set of processed identifiers; ordered so saved files are stable
pub type ProcessedIdSet = BTreeSet<String>;

const FILE_PREFIX: &str = "analyzed_papers_";

/// Errors from reading or writing the state store
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to read state file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("State file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write state file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed dedup store rooted at a state directory
#[derive(Debug, Clone)]
pub struct DedupStore {
    dir: PathBuf,
}

impl DedupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the state file for a topic set
    pub fn path_for(&self, topics: &TopicSet) -> PathBuf {
        self.dir
            .join(format!("{}{}.json", FILE_PREFIX, topics.signature()))
    }

    /// Load processed identifiers; a missing file is an empty history
    pub fn load(&self, topics: &TopicSet) -> Result<ProcessedIdSet, StateError> {
        let path = self.path_for(topics);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No state at {}, starting fresh", path.display());
                return Ok(ProcessedIdSet::new());
            }
            Err(source) => return Err(StateError::Read { path, source }),
        };

        let ids: Vec<String> = serde_json::from_str(&content)
            .map_err(|source| StateError::Corrupt {
                path: path.clone(),
                source,
            })?;

        tracing::debug!("Loaded {} processed ids from {}", ids.len(), path.display());
        Ok(ids.into_iter().collect())
    }

    /// Replace the state for a topic set with `ids`
    pub fn save(&self, ids: &ProcessedIdSet, topics: &TopicSet) -> Result<(), StateError> {
        let path = self.path_for(topics);
        let write_err = |source| StateError::Write {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_err)?;

        let ids: Vec<&String> = ids.iter().collect();
        let json = serde_json::to_string_pretty(&ids)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        tracing::debug!("Saved {} processed ids to {}", ids.len(), path.display());
        Ok(())
    }

    /// Remove the state for a topic set. Returns whether a file was removed.
    pub fn clear(&self, topics: &TopicSet) -> Result<bool, StateError> {
        let path = self.path_for(topics);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StateError::Write { path, source }),
        }
    }
}
