//! Record types held by the metadata, index and audit stores

use crate::identity::DocumentId;
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::Error;

/// Longest title kept after sanitizing
const MAX_TITLE_CHARS: usize = 1000;

/// Location value meaning "use the country instead of a state"
const INTERNATIONAL: &str = "International";

/// Current time in the fixed-width ISO-8601 form used for all record timestamps
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Where the original file lives
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Provenance {
    /// Original file name as uploaded
    pub source_name: String,
    /// Object key inside the container
    pub storage_key: String,
    /// Bucket or directory holding the object
    pub storage_container: String,
}

impl Provenance {
    pub fn new(
        source_name: impl Into<String>,
        storage_key: impl Into<String>,
        storage_container: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            storage_key: storage_key.into(),
            storage_container: storage_container.into(),
        }
    }

    /// Link to the stored object
    pub fn link(&self) -> String {
        let container = self.storage_container.trim_end_matches('/');
        if container.is_empty() {
            self.storage_key.clone()
        } else {
            format!("{}/{}", container, self.storage_key)
        }
    }
}

/// Descriptive facets supplied at upload time. Absent facets are `None`, never "".
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Facets {
    pub title: Option<String>,
    /// Comma-separated list of subjects
    pub subject: Option<String>,
    /// Comma-separated list of formats
    pub format: Option<String>,
    /// Comma-separated list of sources
    pub source: Option<String>,
    pub year: Option<i32>,
    /// State or country
    pub location: Option<String>,
    pub summary: Option<String>,
}

impl Facets {
    /// Blank strings become `None`, titles are sanitized
    pub fn normalized(self) -> Self {
        Self {
            title: non_blank(self.title.map(|t| Self::sanitize_title(&t))),
            subject: non_blank(self.subject),
            format: non_blank(self.format),
            source: non_blank(self.source),
            year: self.year,
            location: non_blank(self.location),
            summary: non_blank(self.summary),
        }
    }

    /// Reduce a title to printable single-line ASCII: accents folded, control
    /// characters dropped, whitespace collapsed, length capped.
    pub fn sanitize_title(value: &str) -> String {
        static WHITESPACE: OnceLock<Regex> = OnceLock::new();
        let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

        let folded: String = value
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
            .collect();
        let collapsed = whitespace.replace_all(&folded, " ");

        collapsed
            .chars()
            .filter(|c| (' '..='~').contains(c))
            .collect::<String>()
            .trim()
            .chars()
            .take(MAX_TITLE_CHARS)
            .collect()
    }

    /// Single location value from an upload form's state and country fields
    pub fn location_from(state: Option<&str>, country: Option<&str>) -> Option<String> {
        let state = state.map(str::trim).filter(|s| !s.is_empty());
        let country = country.map(str::trim).filter(|s| !s.is_empty());
        match state {
            Some(s) if s == INTERNATIONAL => country.map(str::to_string),
            Some(s) => Some(s.to_string()),
            None => None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One document in the metadata store
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Document {
    pub document_id: DocumentId,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub provenance: Provenance,
    pub uploaded_at: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub facets: Facets,
    /// Always true; backs the "all documents, newest first" listing
    pub listable: bool,
}

impl Document {
    pub fn new(document_id: DocumentId, provenance: Provenance, facets: Facets) -> Self {
        Self {
            document_id,
            provenance,
            uploaded_at: timestamp_now(),
            facets,
            listable: true,
        }
    }

    /// Title for display: the supplied title, else the original file name
    pub fn display_title(&self) -> &str {
        self.facets
            .title
            .as_deref()
            .unwrap_or(&self.provenance.source_name)
    }
}

/// One (keyword, document) entry in the inverted index
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Posting {
    pub keyword: String,
    pub document_id: DocumentId,
    /// Occurrences of the keyword in the document text
    pub frequency: u32,
    pub title: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub provenance: Provenance,
    pub uploaded_at: String,
}

impl Posting {
    /// Build a posting whose display fields mirror the document record
    pub fn for_document(doc: &Document, keyword: String, frequency: u32) -> Self {
        Self {
            keyword,
            document_id: doc.document_id.clone(),
            frequency,
            title: Some(doc.display_title().to_string()),
            provenance: doc.provenance.clone(),
            uploaded_at: doc.uploaded_at.clone(),
        }
    }
}

/// Outcome of one ingestion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failure,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStatus::Success => write!(f, "success"),
            AuditStatus::Failure => write!(f, "failure"),
        }
    }
}

impl FromStr for AuditStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(AuditStatus::Success),
            "failure" => Ok(AuditStatus::Failure),
            _ => Err(Error::Other(format!("Unknown audit status: {}", s))),
        }
    }
}

/// Append-only record of one ingestion attempt
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub document_id: DocumentId,
    pub uploaded_at: String,
    pub source_name: String,
    pub status: AuditStatus,
    pub error_message: Option<String>,
}

impl AuditLogEntry {
    pub fn success(document_id: DocumentId, source_name: impl Into<String>) -> Self {
        Self {
            document_id,
            uploaded_at: timestamp_now(),
            source_name: source_name.into(),
            status: AuditStatus::Success,
            error_message: None,
        }
    }

    pub fn failure(
        document_id: DocumentId,
        source_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            document_id,
            uploaded_at: timestamp_now(),
            source_name: source_name.into(),
            status: AuditStatus::Failure,
            error_message: Some(message.into()),
        }
    }
}
