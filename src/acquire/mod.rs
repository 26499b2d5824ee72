//! Full-text acquisition: abstract link -> PDF -> extracted text.
//!
//! Every step can fail and none of those failures is fatal: the acquirer logs
//! and returns `None`, and the pipeline decides what a missing text means.

mod pdf;

pub use pdf::{join_pages, PdfTextExtractor};

use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::utils::HttpClient;

/// Errors that can occur while acquiring a paper's text
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Download failed with status {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to extract text from PDF: {0}")]
    Extraction(String),

    #[error("PDF contains no extractable text")]
    NoText,
}

/// Fetches raw document bytes
#[async_trait]
pub trait PdfFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AcquireError>;
}

/// Converts a stored document into per-page text
pub trait TextExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, AcquireError>;
}

/// Downloads PDFs over HTTP
#[derive(Debug, Clone)]
pub struct HttpPdfFetcher {
    client: HttpClient,
}

impl HttpPdfFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PdfFetcher for HttpPdfFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AcquireError> {
        let response = self
            .client
            .client()
            .get(url)
            .send()
            .await
            .map_err(|e| AcquireError::Network(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AcquireError::Status(response.status().as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AcquireError::Network(format!("Failed to read response: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

/// Derive the PDF location from an abstract page link (`/abs/<id>` -> `/pdf/<id>`)
pub fn pdf_url(abstract_link: &str) -> Result<String, AcquireError> {
    let mut url = Url::parse(abstract_link)
        .map_err(|e| AcquireError::InvalidLink(format!("{}: {}", abstract_link, e)))?;

    let segments: Vec<String> = url
        .path_segments()
        .map(|s| s.map(str::to_string).collect())
        .unwrap_or_default();

    if !segments.iter().any(|s| s == "abs") {
        return Err(AcquireError::InvalidLink(format!(
            "{}: no /abs/ segment",
            abstract_link
        )));
    }

    let path = segments
        .iter()
        .map(|s| if s == "abs" { "pdf" } else { s.as_str() })
        .collect::<Vec<_>>()
        .join("/");
    url.set_path(&path);
    Ok(url.to_string())
}

/// Run-scoped directory for downloaded PDFs
#[derive(Debug, Clone)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create the directory if it is absent
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Refer to the directory without touching the filesystem
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location for a paper's PDF; identifiers with `/` (old-style arXiv ids) are flattened
    pub fn file_for(&self, paper_id: &str) -> PathBuf {
        self.path.join(format!("{}.pdf", paper_id.replace(['/', '\\'], "_")))
    }

    /// Remove every file in the directory and then the directory itself
    pub fn clear(&self) -> io::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        fs::remove_dir(&self.path)
    }
}

/// Resolves a paper to its full text
#[derive(Clone)]
pub struct DocumentAcquirer {
    fetcher: Arc<dyn PdfFetcher>,
    extractor: Arc<dyn TextExtractor>,
    scratch: ScratchDir,
}

impl DocumentAcquirer {
    pub fn new(
        fetcher: Arc<dyn PdfFetcher>,
        extractor: Arc<dyn TextExtractor>,
        scratch: ScratchDir,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            scratch,
        }
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Full text for a paper, or `None` if any step failed
    pub async fn acquire(&self, paper_id: &str, abstract_link: &str) -> Option<String> {
        match self.try_acquire(paper_id, abstract_link).await {
            Ok(text) => {
                tracing::debug!("Extracted {} characters for {}", text.len(), paper_id);
                Some(text)
            }
            Err(e) => {
                tracing::warn!("Could not acquire full text for {}: {}", paper_id, e);
                None
            }
        }
    }

    async fn try_acquire(&self, paper_id: &str, abstract_link: &str) -> Result<String, AcquireError> {
        let url = pdf_url(abstract_link)?;
        let bytes = self.fetcher.fetch(&url).await?;

        let pdf_file = self.scratch.file_for(paper_id);
        fs::write(&pdf_file, &bytes)?;

        let pages = self.extractor.extract_pages(&pdf_file)?;
        join_pages(&pages).ok_or(AcquireError::NoText)
    }
}

impl std::fmt::Debug for DocumentAcquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAcquirer")
            .field("scratch", &self.scratch)
            .finish()
    }
}
