//! Metadata, inverted index and audit log storage
//!
//! This module defines:
//! - Record types (documents, postings, audit entries)
//! - One trait per logical store, all keyed on the content-derived document id
//! - Cursor-based paging and a lazy page stream for draining listings
//! - The SQLite backend

mod records;
mod schema;
mod sqlite;

#[cfg(test)]
pub(crate) mod testing;

pub use records::*;
pub use schema::*;
pub use sqlite::*;

use crate::error::{Error, Result};
use crate::identity::DocumentId;
use async_trait::async_trait;
use futures::stream::{self, Stream, TryStreamExt};
use std::future::Future;

/// Opaque position in a paged listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(pub String);

/// Request for one page of a listing
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// Resume after this position; `None` starts from the beginning
    pub cursor: Option<Cursor>,
    pub limit: usize,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self {
            cursor: None,
            limit,
        }
    }
}

/// One page of results. A store may return fewer than `limit` items and still
/// have more; only `next == None` means the listing is exhausted.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Cursor>,
}

/// Document metadata store
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert or overwrite every field of a document in one write
    async fn upsert_document(&self, doc: &Document) -> Result<()>;

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>>;

    /// All listable documents, newest `uploaded_at` first
    async fn list_documents(&self, page: PageRequest) -> Result<Page<Document>>;
}

/// Inverted index store
#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Insert or overwrite one posting in one write
    async fn put_posting(&self, posting: &Posting) -> Result<()>;

    /// Postings for a keyword, ordered by document id
    async fn postings_for_keyword(&self, keyword: &str, page: PageRequest)
        -> Result<Page<Posting>>;

    /// Keywords currently indexed for a document
    async fn keywords_for_document(&self, id: &DocumentId) -> Result<Vec<String>>;

    /// Delete the given (keyword, document) postings as one batch.
    /// Returns the number of postings removed.
    async fn delete_postings(&self, id: &DocumentId, keywords: &[String]) -> Result<usize>;
}

/// Append-only ingestion audit log
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: &AuditLogEntry) -> Result<()>;

    /// Entries for a document, newest first
    async fn entries_for_document(&self, id: &DocumentId) -> Result<Vec<AuditLogEntry>>;
}

enum PageState {
    Start,
    Next(Cursor),
    Done,
}

/// Lazily walk a paged listing, fetching the next page only when the previous one has
/// been consumed. Restart by calling again.
pub fn paged<'a, T, F, Fut>(page_size: usize, fetch: F) -> impl Stream<Item = Result<T>> + 'a
where
    T: 'a,
    F: FnMut(PageRequest) -> Fut + 'a,
    Fut: Future<Output = Result<Page<T>>> + 'a,
{
    stream::try_unfold((PageState::Start, fetch), move |(state, mut fetch)| async move {
        let cursor = match state {
            PageState::Start => None,
            PageState::Next(cursor) => Some(cursor),
            PageState::Done => return Ok::<_, Error>(None),
        };

        let page = fetch(PageRequest {
            cursor,
            limit: page_size,
        })
        .await?;

        let next = match page.next {
            Some(cursor) => PageState::Next(cursor),
            None => PageState::Done,
        };
        let items = stream::iter(page.items.into_iter().map(Ok::<T, Error>));
        Ok(Some((items, (next, fetch))))
    })
    .try_flatten()
}

/// Every posting for a keyword
pub async fn drain_postings(
    store: &dyn PostingStore,
    keyword: &str,
    page_size: usize,
) -> Result<Vec<Posting>> {
    paged(page_size, |page| store.postings_for_keyword(keyword, page))
        .try_collect()
        .await
}

/// Every listable document, newest first
pub async fn drain_documents(store: &dyn MetadataStore, page_size: usize) -> Result<Vec<Document>> {
    paged(page_size, |page| store.list_documents(page))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn numbers(page: PageRequest, total: usize) -> Page<usize> {
        let start = page
            .cursor
            .map(|c| c.0.parse::<usize>().unwrap())
            .unwrap_or(0);
        // Serve short pages to make sure callers rely on the cursor, not the size
        let end = (start + page.limit.saturating_sub(1).max(1)).min(total);
        Page {
            items: (start..end).collect(),
            next: (end < total).then(|| Cursor(end.to_string())),
        }
    }

    #[tokio::test]
    async fn test_paged_drains_partial_pages() {
        let calls = AtomicUsize::new(0);
        let all: Vec<usize> = paged(4, |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(numbers(page, 10)) }
        })
        .try_collect()
        .await
        .unwrap();

        assert_eq!(all, (0..10).collect::<Vec<_>>());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_paged_is_lazy() {
        let calls = AtomicUsize::new(0);
        let first: Vec<Result<usize>> = paged(4, |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(numbers(page, 100)) }
        })
        .take(2)
        .collect()
        .await;

        assert_eq!(first.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_paged_propagates_errors() {
        let result: Result<Vec<usize>> = paged(4, |page| async move {
            if page.cursor.is_some() {
                Err(Error::StoreRead("page two unavailable".to_string()))
            } else {
                Ok(numbers(page, 10))
            }
        })
        .try_collect()
        .await;

        assert!(matches!(result, Err(Error::StoreRead(_))));
    }
}
