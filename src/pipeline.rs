//! Ingestion pipeline
//!
//! One ingestion runs extraction, tokenization, a metadata upsert, the posting fan-out
//! and an audit append, in that order. Nothing is rolled back on failure: re-running
//! the pipeline on the same bytes converges to the same state.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::TextExtractor;
use crate::identity::{derive_document_id, DocumentId};
use crate::keywords::{keyword_counts, KeywordExtractor};
use crate::store::{
    AuditLog, AuditLogEntry, Document, Facets, MetadataStore, Posting, PostingStore, Provenance,
};
use futures::stream::{self, TryStreamExt};
use tracing::{debug, info, warn};

/// Runs ingestions against a set of shared store handles
pub struct Ingestor<'a> {
    metadata: &'a dyn MetadataStore,
    postings: &'a dyn PostingStore,
    audit: &'a dyn AuditLog,
    extractor: &'a dyn TextExtractor,
    keywords: KeywordExtractor,
    write_concurrency: usize,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        metadata: &'a dyn MetadataStore,
        postings: &'a dyn PostingStore,
        audit: &'a dyn AuditLog,
        extractor: &'a dyn TextExtractor,
    ) -> Self {
        Self {
            metadata,
            postings,
            audit,
            extractor,
            keywords: KeywordExtractor::default(),
            write_concurrency: crate::config::default_write_concurrency(),
        }
    }

    /// Build from one store implementing all three roles, with config limits applied
    pub fn from_config<S>(config: &Config, store: &'a S, extractor: &'a dyn TextExtractor) -> Self
    where
        S: MetadataStore + PostingStore + AuditLog,
    {
        Self::new(store, store, store, extractor)
            .with_keywords(KeywordExtractor::new(config.index.min_keyword_len))
            .with_write_concurrency(config.index.write_concurrency)
    }

    pub fn with_keywords(mut self, keywords: KeywordExtractor) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_write_concurrency(mut self, limit: usize) -> Self {
        self.write_concurrency = limit.max(1);
        self
    }

    /// Ingest one document and return its identity.
    ///
    /// Extraction failures leave both stores untouched. Store failures after extraction
    /// are returned unchanged; whatever was written before the failure stays written.
    /// Every failure appends a `failure` audit entry, every success a `success` entry.
    pub async fn ingest(
        &self,
        content: &[u8],
        provenance: Provenance,
        facets: Facets,
    ) -> Result<DocumentId> {
        let document_id = derive_document_id(content);
        let source_name = provenance.source_name.clone();
        info!(document_id = %document_id, source = %source_name, "Ingesting document");

        let text = match self.extractor.extract(content).await {
            Ok(text) => text,
            Err(e) => {
                let message = match &e {
                    Error::Extraction(reason) => format!("Invalid or corrupt PDF: {}", reason),
                    other => other.to_string(),
                };
                self.record_failure(&document_id, &source_name, &message).await;
                return Err(e);
            }
        };

        let posting_count = match self.index(&document_id, &text, provenance, facets).await {
            Ok(count) => count,
            Err(e) => {
                self.record_failure(&document_id, &source_name, &e.to_string())
                    .await;
                return Err(e);
            }
        };

        let entry = AuditLogEntry::success(document_id.clone(), source_name.clone());
        if let Err(e) = self.audit.append(&entry).await {
            self.record_failure(&document_id, &source_name, &e.to_string())
                .await;
            return Err(e);
        }

        info!(
            document_id = %document_id,
            postings = posting_count,
            "Document indexed"
        );
        Ok(document_id)
    }

    /// Upsert the document, then write one posting per distinct keyword
    async fn index(
        &self,
        document_id: &DocumentId,
        text: &str,
        provenance: Provenance,
        facets: Facets,
    ) -> Result<usize> {
        let counts = keyword_counts(self.keywords.extract(text));
        debug!(document_id = %document_id, keywords = counts.len(), "Counted keywords");

        let doc = Document::new(document_id.clone(), provenance, facets.normalized());
        self.metadata.upsert_document(&doc).await?;

        let posting_count = counts.len();
        let postings = counts.into_iter().map(|(keyword, frequency)| {
            Ok::<_, Error>(Posting::for_document(&doc, keyword, frequency))
        });

        stream::iter(postings)
            .try_for_each_concurrent(self.write_concurrency, |posting| async move {
                self.postings.put_posting(&posting).await
            })
            .await?;

        Ok(posting_count)
    }

    /// Audit a failed attempt. The original error matters more than a failed audit
    /// write, so the latter is only logged.
    async fn record_failure(&self, document_id: &DocumentId, source_name: &str, message: &str) {
        warn!(document_id = %document_id, source = %source_name, "Ingestion failed: {}", message);

        let entry = AuditLogEntry::failure(document_id.clone(), source_name, message);
        if let Err(e) = self.audit.append(&entry).await {
            warn!(document_id = %document_id, "Failed to write audit entry: {}", e);
        }
    }
}
