//! PDF text extraction.
//!
//! Uses the pure-Rust `pdf-extract` crate page by page. Malformed documents
//! can make the parser panic, so extraction runs inside `catch_unwind` and a
//! panic is reported as an ordinary extraction failure.

use std::panic;
use std::path::Path;

use super::{AcquireError, TextExtractor};

/// Extracts text from a PDF on disk, one string per page
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, AcquireError> {
        if !path.is_file() {
            return Err(AcquireError::Extraction(format!(
                "File not found: {}",
                path.display()
            )));
        }

        match panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path)) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(AcquireError::Extraction(e.to_string())),
            Err(_) => Err(AcquireError::Extraction(format!(
                "PDF parser panicked on {}",
                path.display()
            ))),
        }
    }
}

/// Join the pages that produced any text
pub fn join_pages(pages: &[String]) -> Option<String> {
    let text = pages
        .iter()
        .filter(|page| !page.trim().is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_nonexistent_file() {
        let result = PdfTextExtractor::new().extract_pages(Path::new("/nonexistent/file.pdf"));
        assert!(matches!(result, Err(AcquireError::Extraction(_))));
    }

    #[test]
    fn test_extract_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let result = PdfTextExtractor::new().extract_pages(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_join_pages_skips_blank_pages() {
        let pages = vec![
            "Introduction".to_string(),
            "   \n".to_string(),
            String::new(),
            "Conclusion".to_string(),
        ];
        assert_eq!(join_pages(&pages).as_deref(), Some("Introduction\nConclusion"));
    }

    #[test]
    fn test_join_pages_without_text() {
        assert_eq!(join_pages(&[" ".to_string()]), None);
        assert_eq!(join_pages(&[]), None);
    }
}
