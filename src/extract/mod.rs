//! Text extraction from uploaded documents
//!
//! This module handles:
//! - Upload-boundary content type checks (extension, MIME, magic bytes)
//! - The `TextExtractor` abstraction over PDF parsers
//! - A `pdf-extract` backed implementation

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Leading bytes of every PDF file
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// How far into the file the PDF header may appear
const MAGIC_SEARCH_WINDOW: usize = 1024;

/// Content types the upload boundary distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension
    pub fn from_extension(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => ContentType::Pdf,
            _ => ContentType::Unknown,
        }
    }

    /// Detect content type from MIME type
    pub fn from_mime(mime: &str) -> Self {
        if mime.to_lowercase().starts_with("application/pdf") {
            ContentType::Pdf
        } else {
            ContentType::Unknown
        }
    }

    /// Detect from path, falling back to the MIME type guessed for it
    pub fn detect(path: &Path) -> Self {
        let detected = Self::from_extension(path);
        if detected != ContentType::Unknown {
            return detected;
        }

        mime_guess::from_path(path)
            .first_raw()
            .map(Self::from_mime)
            .unwrap_or(ContentType::Unknown)
    }
}

/// Check whether bytes carry a PDF header
pub fn has_pdf_magic(data: &[u8]) -> bool {
    let window = &data[..data.len().min(MAGIC_SEARCH_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Reject anything that is not a PDF before extraction work starts
pub fn ensure_pdf(path: &Path, data: &[u8]) -> Result<()> {
    if ContentType::detect(path) != ContentType::Pdf {
        return Err(Error::UnsupportedContentType(format!(
            "{}: only PDF files are allowed",
            path.display()
        )));
    }
    if !has_pdf_magic(data) {
        return Err(Error::UnsupportedContentType(format!(
            "{}: missing PDF header",
            path.display()
        )));
    }
    Ok(())
}

/// Trait for document text extractors
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract plain text, failing with `Error::Extraction` on unparsable input
    async fn extract(&self, data: &[u8]) -> Result<String>;
}

/// PDF text extractor backed by `pdf-extract`
#[derive(Debug, Default, Clone)]
pub struct PdfExtractor;

#[cfg(feature = "pdf")]
#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, data: &[u8]) -> Result<String> {
        let bytes = data.to_vec();
        let size = bytes.len();

        // The parser is CPU bound and may panic on malformed input; a panic surfaces
        // as a JoinError here.
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| Error::Extraction(format!("PDF parser aborted: {}", e)))?
            .map_err(|e| Error::Extraction(e.to_string()))?;

        debug!(bytes = size, chars = text.len(), "Extracted PDF text");
        Ok(text)
    }
}

#[cfg(not(feature = "pdf"))]
#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, data: &[u8]) -> Result<String> {
        debug!(bytes = data.len(), "PDF support not compiled in");
        Err(Error::Extraction(
            "PDF support not compiled in; rebuild with the 'pdf' feature".to_string(),
        ))
    }
}

/// Extractors that skip PDF parsing, for pipeline and query tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Marker that makes `PlainTextExtractor` fail like a corrupt PDF
    pub const CORRUPT_MARKER: &str = "%%CORRUPT%%";

    /// Treats the bytes as UTF-8 text
    pub struct PlainTextExtractor;

    #[async_trait]
    impl TextExtractor for PlainTextExtractor {
        async fn extract(&self, data: &[u8]) -> Result<String> {
            let text = String::from_utf8_lossy(data);
            if text.contains(CORRUPT_MARKER) {
                return Err(Error::Extraction("bad xref table".to_string()));
            }
            Ok(text.into_owned())
        }
    }
}
