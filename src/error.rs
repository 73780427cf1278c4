//! Custom error types for docsift

use thiserror::Error;

/// Main error type for docsift operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Source content could not be turned into text. Retrying with the same bytes
    /// will fail the same way.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Content-derived identity already present in the metadata store
    #[error("Document already exists in the index: {0}")]
    DuplicateDocument(String),

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("Store read failed: {0}")]
    StoreRead(String),

    #[error(
        "Deleted {applied_batches} of {total_batches} batches for document {document_id} before failure: {source}"
    )]
    BatchPartialFailure {
        document_id: String,
        applied_batches: usize,
        total_batches: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Not initialized: run 'docsift init' first")]
    NotInitialized,

    #[error("Already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Transient infrastructure failures the caller may retry as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::StoreWrite(_)
                | Error::StoreRead(_)
                | Error::Database(_)
                | Error::BatchPartialFailure { .. }
        )
    }

    /// Short machine-friendly label used in CLI output and stats
    pub fn category(&self) -> &'static str {
        match self {
            Error::Extraction(_) => "extraction",
            Error::DuplicateDocument(_) => "duplicate",
            Error::UnsupportedContentType(_) => "unsupported",
            Error::StoreWrite(_) | Error::StoreRead(_) | Error::Database(_) => "store",
            Error::BatchPartialFailure { .. } => "partial",
            _ => "other",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

/// Result type alias for docsift
pub type Result<T> = std::result::Result<T, Error>;
