//! SQLite backend for the metadata, index and audit stores

use super::{
    AuditLog, AuditLogEntry, Cursor, Document, MetadataStore, Page, PageRequest, Posting,
    PostingStore, REQUIRED_TABLES, SCHEMA_SQL,
};
use crate::config::{Config, MAX_DELETE_BATCH};
use crate::error::{Error, Result};
use crate::identity::DocumentId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

/// Separates the two halves of a document listing cursor
const CURSOR_SEPARATOR: char = '|';

fn read_err(err: sqlx::Error) -> Error {
    Error::StoreRead(err.to_string())
}

fn write_err(err: sqlx::Error) -> Error {
    Error::StoreWrite(err.to_string())
}

/// Row counts across the three tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub keyword_count: usize,
    pub posting_count: usize,
    pub log_count: usize,
}

/// Index database handle. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the database named by the config
    pub async fn connect(config: &Config) -> Result<Self> {
        let db_path = &config.paths.db_file;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Open a database file directly, creating the schema if needed
    pub async fn new(db_path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.paths.db_file = db_path.to_path_buf();

        let store = Self::connect(&config).await?;
        if !store.is_initialized().await? {
            store.init_schema().await?;
        }
        Ok(store)
    }

    /// Create tables and indexes
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check that every table exists
    pub async fn is_initialized(&self) -> Result<bool> {
        let mut found = 0usize;
        for table in REQUIRED_TABLES {
            let row: Option<(i32,)> =
                sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?")
                    .bind(*table)
                    .fetch_optional(&self.pool)
                    .await?;
            if row.is_some() {
                found += 1;
            }
        }
        Ok(found == REQUIRED_TABLES.len())
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        let document_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(read_err)?;

        let keyword_count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT keyword) FROM postings")
            .fetch_one(&self.pool)
            .await
            .map_err(read_err)?;

        let posting_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM postings")
            .fetch_one(&self.pool)
            .await
            .map_err(read_err)?;

        let log_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingestion_log")
            .fetch_one(&self.pool)
            .await
            .map_err(read_err)?;

        Ok(IndexStats {
            document_count: document_count as usize,
            keyword_count: keyword_count as usize,
            posting_count: posting_count as usize,
            log_count: log_count as usize,
        })
    }
}

fn page_limit(page: &PageRequest) -> usize {
    page.limit.max(1)
}

/// A full page may be followed by more rows; a short one ends the listing
fn next_cursor<T>(items: &[T], limit: usize, cursor: impl FnOnce(&T) -> String) -> Option<Cursor> {
    if items.len() < limit {
        return None;
    }
    items.last().map(|last| Cursor(cursor(last)))
}

fn document_cursor(doc: &Document) -> String {
    format!(
        "{}{}{}",
        doc.uploaded_at, CURSOR_SEPARATOR, doc.document_id
    )
}

fn parse_document_cursor(cursor: &Cursor) -> Result<(&str, &str)> {
    cursor
        .0
        .split_once(CURSOR_SEPARATOR)
        .ok_or_else(|| Error::StoreRead(format!("Invalid document cursor: {}", cursor.0)))
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn upsert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (document_id, source_name, storage_key, storage_container, uploaded_at,
                                   title, subject, format, source, year, location, summary, listable)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(document_id) DO UPDATE SET
                source_name = excluded.source_name,
                storage_key = excluded.storage_key,
                storage_container = excluded.storage_container,
                uploaded_at = excluded.uploaded_at,
                title = excluded.title,
                subject = excluded.subject,
                format = excluded.format,
                source = excluded.source,
                year = excluded.year,
                location = excluded.location,
                summary = excluded.summary,
                listable = excluded.listable
            "#,
        )
        .bind(&doc.document_id)
        .bind(&doc.provenance.source_name)
        .bind(&doc.provenance.storage_key)
        .bind(&doc.provenance.storage_container)
        .bind(&doc.uploaded_at)
        .bind(&doc.facets.title)
        .bind(&doc.facets.subject)
        .bind(&doc.facets.format)
        .bind(&doc.facets.source)
        .bind(doc.facets.year)
        .bind(&doc.facets.location)
        .bind(&doc.facets.summary)
        .bind(doc.listable)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        debug!(document_id = %doc.document_id, "Upserted document");
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE document_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_err)
    }

    async fn list_documents(&self, page: PageRequest) -> Result<Page<Document>> {
        let limit = page_limit(&page);

        let items = match &page.cursor {
            None => {
                sqlx::query_as::<_, Document>(
                    r#"
                    SELECT * FROM documents
                    WHERE listable = 1
                    ORDER BY uploaded_at DESC, document_id DESC
                    LIMIT ?
                    "#,
                )
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            Some(cursor) => {
                let (uploaded_at, document_id) = parse_document_cursor(cursor)?;
                sqlx::query_as::<_, Document>(
                    r#"
                    SELECT * FROM documents
                    WHERE listable = 1
                      AND (uploaded_at < ? OR (uploaded_at = ? AND document_id < ?))
                    ORDER BY uploaded_at DESC, document_id DESC
                    LIMIT ?
                    "#,
                )
                .bind(uploaded_at)
                .bind(uploaded_at)
                .bind(document_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(read_err)?;

        let next = next_cursor(&items, limit, document_cursor);
        Ok(Page { items, next })
    }
}

#[async_trait]
impl PostingStore for SqliteStore {
    async fn put_posting(&self, posting: &Posting) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO postings (keyword, document_id, frequency, title, source_name,
                                  storage_key, storage_container, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(keyword, document_id) DO UPDATE SET
                frequency = excluded.frequency,
                title = excluded.title,
                source_name = excluded.source_name,
                storage_key = excluded.storage_key,
                storage_container = excluded.storage_container,
                uploaded_at = excluded.uploaded_at
            "#,
        )
        .bind(&posting.keyword)
        .bind(&posting.document_id)
        .bind(posting.frequency)
        .bind(&posting.title)
        .bind(&posting.provenance.source_name)
        .bind(&posting.provenance.storage_key)
        .bind(&posting.provenance.storage_container)
        .bind(&posting.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn postings_for_keyword(
        &self,
        keyword: &str,
        page: PageRequest,
    ) -> Result<Page<Posting>> {
        let limit = page_limit(&page);
        let after = page.cursor.as_ref().map(|c| c.0.as_str()).unwrap_or("");

        let items = sqlx::query_as::<_, Posting>(
            r#"
            SELECT * FROM postings
            WHERE keyword = ? AND document_id > ?
            ORDER BY document_id
            LIMIT ?
            "#,
        )
        .bind(keyword)
        .bind(after)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        let next = next_cursor(&items, limit, |p| p.document_id.to_string());
        Ok(Page { items, next })
    }

    async fn keywords_for_document(&self, id: &DocumentId) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT keyword FROM postings WHERE document_id = ? ORDER BY keyword")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(read_err)
    }

    async fn delete_postings(&self, id: &DocumentId, keywords: &[String]) -> Result<usize> {
        if keywords.len() > MAX_DELETE_BATCH {
            return Err(Error::StoreWrite(format!(
                "Batch of {} deletions exceeds the limit of {}",
                keywords.len(),
                MAX_DELETE_BATCH
            )));
        }

        let mut tx = self.pool.begin().await.map_err(write_err)?;
        let mut removed = 0u64;
        for keyword in keywords {
            let result = sqlx::query("DELETE FROM postings WHERE keyword = ? AND document_id = ?")
                .bind(keyword)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(write_err)?;
            removed += result.rows_affected();
        }
        tx.commit().await.map_err(write_err)?;

        Ok(removed as usize)
    }
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ingestion_log (document_id, uploaded_at, source_name, status, error_message)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.document_id)
        .bind(&entry.uploaded_at)
        .bind(&entry.source_name)
        .bind(entry.status)
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn entries_for_document(&self, id: &DocumentId) -> Result<Vec<AuditLogEntry>> {
        sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM ingestion_log WHERE document_id = ? ORDER BY uploaded_at DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{drain_documents, drain_postings, AuditStatus, Facets, Provenance};
    use tempfile::TempDir;

    async fn setup_test_db() -> (SqliteStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::new(&tmp.path().join("test.db")).await.unwrap();
        (store, tmp)
    }

    fn doc(id: &str, uploaded_at: &str) -> Document {
        let mut doc = Document::new(
            DocumentId::new(id),
            Provenance::new(format!("{}.pdf", id), format!("{}.pdf", id), "/docs"),
            Facets::default(),
        );
        doc.uploaded_at = uploaded_at.to_string();
        doc
    }

    #[tokio::test]
    async fn test_schema_initialized() {
        let (store, _tmp) = setup_test_db().await;
        assert!(store.is_initialized().await.unwrap());
        // Running the DDL twice is harmless
        store.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_document_upsert_overwrites_facets() {
        let (store, _tmp) = setup_test_db().await;

        let mut d = doc("aa", "2024-01-01T00:00:00.000000Z");
        d.facets = Facets {
            title: Some("Budget Plan".to_string()),
            subject: Some("Finance,Planning".to_string()),
            year: Some(2020),
            ..Default::default()
        };
        store.upsert_document(&d).await.unwrap();

        d.facets.year = Some(2021);
        d.facets.subject = None;
        store.upsert_document(&d).await.unwrap();

        let loaded = store.get_document(&d.document_id).await.unwrap().unwrap();
        assert_eq!(loaded.facets.year, Some(2021));
        assert_eq!(loaded.facets.subject, None);
        assert_eq!(loaded.facets.title.as_deref(), Some("Budget Plan"));
        assert!(loaded.listable);
        assert_eq!(store.stats().await.unwrap().document_count, 1);

        assert!(store
            .get_document(&DocumentId::new("missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_document_listing_newest_first_across_pages() {
        let (store, _tmp) = setup_test_db().await;

        for (id, ts) in [
            ("d1", "2024-01-01T00:00:00.000000Z"),
            ("d2", "2024-03-01T00:00:00.000000Z"),
            ("d3", "2024-02-01T00:00:00.000000Z"),
            ("d4", "2024-02-01T00:00:00.000000Z"),
            ("d5", "2024-04-01T00:00:00.000000Z"),
        ] {
            store.upsert_document(&doc(id, ts)).await.unwrap();
        }

        let first = store.list_documents(PageRequest::first(2)).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.next.is_some());

        let all = drain_documents(&store, 2).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|d| d.document_id.as_str()).collect();
        assert_eq!(ids, vec!["d5", "d2", "d4", "d3", "d1"]);
    }

    #[tokio::test]
    async fn test_postings_paging_and_delete() {
        let (store, _tmp) = setup_test_db().await;

        for id in ["p1", "p2", "p3"] {
            let d = doc(id, "2024-01-01T00:00:00.000000Z");
            store.upsert_document(&d).await.unwrap();
            store
                .put_posting(&Posting::for_document(&d, "budget".to_string(), 2))
                .await
                .unwrap();
            store
                .put_posting(&Posting::for_document(&d, "plan".to_string(), 1))
                .await
                .unwrap();
        }

        let postings = drain_postings(&store, "budget", 2).await.unwrap();
        assert_eq!(postings.len(), 3);
        assert!(postings.iter().all(|p| p.frequency == 2));

        let id = DocumentId::new("p2");
        assert_eq!(
            store.keywords_for_document(&id).await.unwrap(),
            vec!["budget", "plan"]
        );

        let removed = store
            .delete_postings(&id, &["budget".to_string(), "absent".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(drain_postings(&store, "budget", 10).await.unwrap().len(), 2);
        assert_eq!(store.keywords_for_document(&id).await.unwrap(), vec!["plan"]);
    }

    #[tokio::test]
    async fn test_oversized_delete_batch_rejected() {
        let (store, _tmp) = setup_test_db().await;
        let keywords: Vec<String> = (0..26).map(|i| format!("kw{}", i)).collect();

        let err = store
            .delete_postings(&DocumentId::new("x"), &keywords)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StoreWrite(_)));
    }

    #[tokio::test]
    async fn test_audit_log_newest_first() {
        let (store, _tmp) = setup_test_db().await;
        let id = DocumentId::new("a1");

        let mut failed = AuditLogEntry::failure(id.clone(), "a.pdf", "Invalid or corrupt PDF");
        failed.uploaded_at = "2024-01-01T00:00:00.000000Z".to_string();
        let mut ok = AuditLogEntry::success(id.clone(), "a.pdf");
        ok.uploaded_at = "2024-01-02T00:00:00.000000Z".to_string();

        store.append(&failed).await.unwrap();
        store.append(&ok).await.unwrap();

        let entries = store.entries_for_document(&id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, AuditStatus::Success);
        assert_eq!(entries[1].status, AuditStatus::Failure);
        assert_eq!(
            entries[1].error_message.as_deref(),
            Some("Invalid or corrupt PDF")
        );
        assert_eq!(store.stats().await.unwrap().log_count, 2);
    }
}
