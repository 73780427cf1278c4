//! Document listing and audit log commands

use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::DocumentId;
use crate::store::{drain_documents, AuditLog, AuditLogEntry, AuditStatus, Document, MetadataStore};
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::info;

/// Text facet used to order a document listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Subject,
    Format,
    Source,
}

impl SortKey {
    fn value<'d>(&self, doc: &'d Document) -> Option<&'d str> {
        match self {
            SortKey::Title => Some(doc.display_title()),
            SortKey::Subject => doc.facets.subject.as_deref(),
            SortKey::Format => doc.facets.format.as_deref(),
            SortKey::Source => doc.facets.source.as_deref(),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Title => write!(f, "title"),
            SortKey::Subject => write!(f, "subject"),
            SortKey::Format => write!(f, "format"),
            SortKey::Source => write!(f, "source"),
        }
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "title" => Ok(SortKey::Title),
            "subject" => Ok(SortKey::Subject),
            "format" => Ok(SortKey::Format),
            "source" => Ok(SortKey::Source),
            _ => Err(Error::Config(format!("Unknown sort key: {}", s))),
        }
    }
}

/// Case-insensitive comparison that orders blank values after everything else
fn compare_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    let a = a.map(|v| v.trim().to_lowercase()).unwrap_or_default();
    let b = b.map(|v| v.trim().to_lowercase()).unwrap_or_default();
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(&b),
    }
}

/// Stable sort, so ties keep newest-first order
pub fn sort_by_text_key(docs: &mut [Document], key: SortKey) {
    docs.sort_by(|a, b| compare_text(key.value(a), key.value(b)));
}

/// Every indexed document, newest first unless a sort key is given
pub async fn cmd_list_documents(
    config: &Config,
    store: &dyn MetadataStore,
    sort: Option<SortKey>,
) -> Result<Vec<Document>> {
    info!("Listing documents");

    let mut docs = drain_documents(store, config.query.page_size).await?;
    if let Some(key) = sort {
        sort_by_text_key(&mut docs, key);
    }
    Ok(docs)
}

/// Ingestion attempts for one document, newest first
pub async fn cmd_audit_log(store: &dyn AuditLog, id: &DocumentId) -> Result<Vec<AuditLogEntry>> {
    let entries = store.entries_for_document(id).await?;
    if entries.is_empty() {
        return Err(Error::DocumentNotFound(id.to_string()));
    }
    Ok(entries)
}

/// Print document list to console
pub fn print_documents(docs: &[Document]) {
    println!("\n📚 Indexed Documents\n");

    if docs.is_empty() {
        println!("No documents indexed. Use 'docsift ingest' to add some.");
        return;
    }

    for doc in docs {
        println!("• {}", doc.display_title());
        println!("  ID: {}", doc.document_id);
        println!("  File: {}", doc.provenance.link());
        if let Some(subject) = &doc.facets.subject {
            println!("  Subject: {}", subject);
        }
        if let Some(year) = doc.facets.year {
            println!("  Year: {}", year);
        }
        println!("  Uploaded: {}", doc.uploaded_at);
        println!();
    }

    println!("{} documents", docs.len());
}

/// Print audit log entries to console
pub fn print_audit_log(entries: &[AuditLogEntry]) {
    for entry in entries {
        let marker = match entry.status {
            AuditStatus::Success => "✓",
            AuditStatus::Failure => "✗",
        };
        println!(
            "{} {} {} ({})",
            marker, entry.uploaded_at, entry.status, entry.source_name
        );
        if let Some(message) = &entry.error_message {
            println!("    {}", message);
        }
    }
}
