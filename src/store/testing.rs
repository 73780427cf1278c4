//! In-memory stores with failure injection for tests

use super::{
    AuditLog, AuditLogEntry, AuditStatus, Cursor, Document, MetadataStore, Page, PageRequest, Posting,
    PostingStore,
};
use crate::config::MAX_DELETE_BATCH;
use crate::error::{Error, Result};
use crate::identity::DocumentId;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    documents: BTreeMap<DocumentId, Document>,
    postings: BTreeMap<(String, DocumentId), Posting>,
    audit: Vec<AuditLogEntry>,
    delete_batches: Vec<usize>,
    posting_writes: usize,
}

/// Implements all three store traits over maps behind one mutex
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    page_cap: Option<usize>,
    fail_delete_call: Option<usize>,
    fail_posting_keyword: Option<String>,
    fail_keyword_read: Option<String>,
    fail_document_writes: bool,
    fail_audit: bool,
    fail_success_audit: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve at most `cap` items per page regardless of the requested limit
    pub fn with_page_cap(mut self, cap: usize) -> Self {
        self.page_cap = Some(cap.max(1));
        self
    }

    /// Fail the nth (1-based) `delete_postings` call
    pub fn failing_delete_call(mut self, call: usize) -> Self {
        self.fail_delete_call = Some(call);
        self
    }

    pub fn failing_posting(mut self, keyword: &str) -> Self {
        self.fail_posting_keyword = Some(keyword.to_string());
        self
    }

    pub fn failing_keyword_read(mut self, keyword: &str) -> Self {
        self.fail_keyword_read = Some(keyword.to_string());
        self
    }

    pub fn failing_document_writes(mut self) -> Self {
        self.fail_document_writes = true;
        self
    }

    pub fn failing_audit(mut self) -> Self {
        self.fail_audit = true;
        self
    }

    /// Reject only `success` audit entries
    pub fn failing_success_audit(mut self) -> Self {
        self.fail_success_audit = true;
        self
    }

    pub fn documents(&self) -> Vec<Document> {
        self.state.lock().unwrap().documents.values().cloned().collect()
    }

    /// All postings ordered by (keyword, document)
    pub fn postings(&self) -> Vec<Posting> {
        self.state.lock().unwrap().postings.values().cloned().collect()
    }

    /// Audit entries in append order
    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.state.lock().unwrap().audit.clone()
    }

    /// Size of every batch passed to `delete_postings`, in call order
    pub fn delete_batches(&self) -> Vec<usize> {
        self.state.lock().unwrap().delete_batches.clone()
    }

    pub fn posting_writes(&self) -> usize {
        self.state.lock().unwrap().posting_writes
    }

    fn page<T: Clone>(&self, items: Vec<T>, page: &PageRequest) -> Result<Page<T>> {
        let start = match &page.cursor {
            Some(cursor) => cursor
                .0
                .parse::<usize>()
                .map_err(|_| Error::StoreRead(format!("Invalid cursor: {}", cursor.0)))?,
            None => 0,
        };
        let size = match self.page_cap {
            Some(cap) => cap.min(page.limit.max(1)),
            None => page.limit.max(1),
        };
        let end = (start + size).min(items.len());
        Ok(Page {
            items: items[start.min(end)..end].to_vec(),
            next: (end < items.len()).then(|| Cursor(end.to_string())),
        })
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn upsert_document(&self, doc: &Document) -> Result<()> {
        if self.fail_document_writes {
            return Err(Error::StoreWrite("metadata table unavailable".to_string()));
        }
        self.state
            .lock()
            .unwrap()
            .documents
            .insert(doc.document_id.clone(), doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        Ok(self.state.lock().unwrap().documents.get(id).cloned())
    }

    async fn list_documents(&self, page: PageRequest) -> Result<Page<Document>> {
        let mut docs: Vec<Document> = self
            .state
            .lock()
            .unwrap()
            .documents
            .values()
            .filter(|d| d.listable)
            .cloned()
            .collect();
        docs.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| b.document_id.cmp(&a.document_id))
        });
        self.page(docs, &page)
    }
}

#[async_trait]
impl PostingStore for MemoryStore {
    async fn put_posting(&self, posting: &Posting) -> Result<()> {
        if self.fail_posting_keyword.as_deref() == Some(posting.keyword.as_str()) {
            return Err(Error::StoreWrite(format!(
                "throughput exceeded writing '{}'",
                posting.keyword
            )));
        }
        let mut state = self.state.lock().unwrap();
        state.posting_writes += 1;
        state.postings.insert(
            (posting.keyword.clone(), posting.document_id.clone()),
            posting.clone(),
        );
        Ok(())
    }

    async fn postings_for_keyword(
        &self,
        keyword: &str,
        page: PageRequest,
    ) -> Result<Page<Posting>> {
        if self.fail_keyword_read.as_deref() == Some(keyword) {
            return Err(Error::StoreRead(format!("timeout reading '{}'", keyword)));
        }
        let postings: Vec<Posting> = self
            .state
            .lock()
            .unwrap()
            .postings
            .values()
            .filter(|p| p.keyword == keyword)
            .cloned()
            .collect();
        self.page(postings, &page)
    }

    async fn keywords_for_document(&self, id: &DocumentId) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .postings
            .values()
            .filter(|p| &p.document_id == id)
            .map(|p| p.keyword.clone())
            .collect())
    }

    async fn delete_postings(&self, id: &DocumentId, keywords: &[String]) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.delete_batches.push(keywords.len());

        if keywords.len() > MAX_DELETE_BATCH {
            return Err(Error::StoreWrite("batch too large".to_string()));
        }
        if self.fail_delete_call == Some(state.delete_batches.len()) {
            return Err(Error::StoreWrite("batch write rejected".to_string()));
        }

        let removed = keywords
            .iter()
            .filter(|kw| {
                state
                    .postings
                    .remove(&((*kw).clone(), id.clone()))
                    .is_some()
            })
            .count();
        Ok(removed)
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        if self.fail_audit
            || (self.fail_success_audit && entry.status == AuditStatus::Success)
        {
            return Err(Error::StoreWrite("audit table unavailable".to_string()));
        }
        self.state.lock().unwrap().audit.push(entry.clone());
        Ok(())
    }

    async fn entries_for_document(&self, id: &DocumentId) -> Result<Vec<AuditLogEntry>> {
        let mut entries: Vec<AuditLogEntry> = self
            .state
            .lock()
            .unwrap()
            .audit
            .iter()
            .filter(|e| &e.document_id == id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(entries)
    }
}
