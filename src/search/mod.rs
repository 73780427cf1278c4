//! Keyword and facet search
//!
//! A query tokenizes its phrase, intersects the posting lists of every keyword, then
//! walks the full document listing applying facet, year and location filters.
//! Searching never writes.

mod filter;

pub use filter::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::DocumentId;
use crate::keywords::KeywordExtractor;
use crate::store::{drain_documents, drain_postings, Document, MetadataStore, PostingStore};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::pin::pin;
use tracing::{debug, info};

/// Search criteria. Every field is optional; an empty request lists every document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub phrase: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub formats: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub location: Option<String>,
    /// Matches skipped before the first returned hit
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

impl SearchRequest {
    fn matches_facets(&self, doc: &Document) -> bool {
        let facets = &doc.facets;
        csv_contains_any(facets.subject.as_deref(), &self.subjects)
            && csv_contains_any(facets.format.as_deref(), &self.formats)
            && csv_contains_any(facets.source.as_deref(), &self.sources)
            && year_matches(facets.year, self.start_year, self.end_year)
            && location_matches(facets.location.as_deref(), self.location.as_deref())
    }
}

/// One matching document, shaped for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentHit {
    pub document_id: DocumentId,
    pub title: String,
    pub link: String,
    pub source_name: String,
    pub uploaded_at: String,
    pub subject: Option<String>,
    pub format: Option<String>,
    pub source: Option<String>,
    pub year: Option<i32>,
    pub location: Option<String>,
    pub summary: Option<String>,
    /// Query keywords found in the document; empty without a phrase
    pub matched_keywords: Vec<String>,
}

impl DocumentHit {
    fn new(doc: Document, matched_keywords: Vec<String>) -> Self {
        Self {
            title: doc.display_title().to_string(),
            link: doc.provenance.link(),
            document_id: doc.document_id,
            source_name: doc.provenance.source_name,
            uploaded_at: doc.uploaded_at,
            subject: doc.facets.subject,
            format: doc.facets.format,
            source: doc.facets.source,
            year: doc.facets.year,
            location: doc.facets.location,
            summary: doc.facets.summary,
            matched_keywords,
        }
    }
}

/// Search results, newest upload first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matches before offset and limit were applied
    pub total: usize,
    pub offset: usize,
    /// Keywords the phrase reduced to
    pub keywords: Vec<String>,
    pub hits: Vec<DocumentHit>,
}

/// Read-only query engine over the metadata and index stores
pub struct SearchEngine<'a> {
    metadata: &'a dyn MetadataStore,
    postings: &'a dyn PostingStore,
    keywords: KeywordExtractor,
    page_size: usize,
    fetch_concurrency: usize,
    default_limit: Option<usize>,
}

impl<'a> SearchEngine<'a> {
    pub fn new(metadata: &'a dyn MetadataStore, postings: &'a dyn PostingStore) -> Self {
        Self {
            metadata,
            postings,
            keywords: KeywordExtractor::default(),
            page_size: crate::config::default_page_size(),
            fetch_concurrency: crate::config::default_fetch_concurrency(),
            default_limit: None,
        }
    }

    pub fn from_config<S>(config: &Config, store: &'a S) -> Self
    where
        S: MetadataStore + PostingStore,
    {
        Self {
            keywords: KeywordExtractor::new(config.index.min_keyword_len),
            page_size: config.query.page_size.max(1),
            fetch_concurrency: config.query.fetch_concurrency.max(1),
            default_limit: config.query.default_limit,
            ..Self::new(store, store)
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit.max(1);
        self
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let keywords = request
            .phrase
            .as_deref()
            .map(|phrase| self.keywords.extract_unique(phrase))
            .unwrap_or_default();

        debug!(keywords = ?keywords, "Searching");

        // Without keywords every document is a candidate
        let matching = if keywords.is_empty() {
            None
        } else {
            let ids = self.intersect_postings(&keywords).await?;
            if ids.is_empty() {
                info!(keywords = ?keywords, "No document contains every keyword");
                return Ok(SearchResponse {
                    keywords,
                    offset: request.offset,
                    ..Default::default()
                });
            }
            Some(ids)
        };

        let documents = drain_documents(self.metadata, self.page_size).await?;
        let matched: Vec<Document> = documents
            .into_iter()
            .filter(|doc| {
                matching
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&doc.document_id))
            })
            .filter(|doc| request.matches_facets(doc))
            .collect();

        let total = matched.len();
        let limit = request.limit.or(self.default_limit).unwrap_or(usize::MAX);
        let hits = matched
            .into_iter()
            .skip(request.offset)
            .take(limit)
            .map(|doc| DocumentHit::new(doc, keywords.clone()))
            .collect();

        info!(total, "Search complete");
        Ok(SearchResponse {
            total,
            offset: request.offset,
            keywords,
            hits,
        })
    }

    /// Documents holding every keyword. Posting lists are drained concurrently; the
    /// first empty list ends the search with no matches.
    async fn intersect_postings(&self, keywords: &[String]) -> Result<HashSet<DocumentId>> {
        let fetches = stream::iter(keywords)
            .map(|keyword| async move {
                let postings = drain_postings(self.postings, keyword, self.page_size).await?;
                Ok::<_, Error>((keyword, postings))
            })
            .buffer_unordered(self.fetch_concurrency);
        let mut fetches = pin!(fetches);

        let mut matching: Option<HashSet<DocumentId>> = None;
        while let Some((keyword, postings)) = fetches.try_next().await? {
            debug!(keyword = %keyword, postings = postings.len(), "Fetched posting list");

            let ids: HashSet<DocumentId> = postings.into_iter().map(|p| p.document_id).collect();
            let narrowed = match matching.take() {
                None => ids,
                Some(acc) => acc.into_iter().filter(|id| ids.contains(id)).collect(),
            };
            if narrowed.is_empty() {
                return Ok(HashSet::new());
            }
            matching = Some(narrowed);
        }

        Ok(matching.unwrap_or_default())
    }
}
