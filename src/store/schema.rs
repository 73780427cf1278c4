//! SQLite schema definition

/// SQL schema for the index database
pub const SCHEMA_SQL: &str = r#"
-- Documents: one row per content-derived identity
CREATE TABLE IF NOT EXISTS documents (
    document_id TEXT PRIMARY KEY,
    source_name TEXT NOT NULL,
    storage_key TEXT NOT NULL,
    storage_container TEXT NOT NULL,
    uploaded_at TEXT NOT NULL,
    title TEXT,
    subject TEXT,
    format TEXT,
    source TEXT,
    year INTEGER,
    location TEXT,
    summary TEXT,
    listable INTEGER NOT NULL DEFAULT 1
);

-- Postings: inverted index, one row per (keyword, document)
CREATE TABLE IF NOT EXISTS postings (
    keyword TEXT NOT NULL,
    document_id TEXT NOT NULL,
    frequency INTEGER NOT NULL CHECK (frequency >= 1),
    title TEXT,
    source_name TEXT NOT NULL,
    storage_key TEXT NOT NULL,
    storage_container TEXT NOT NULL,
    uploaded_at TEXT NOT NULL,
    PRIMARY KEY (keyword, document_id)
);

-- Ingestion log: append-only audit of every ingestion attempt
CREATE TABLE IF NOT EXISTS ingestion_log (
    document_id TEXT NOT NULL,
    uploaded_at TEXT NOT NULL,
    source_name TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('success', 'failure')),
    error_message TEXT,
    PRIMARY KEY (document_id, uploaded_at)
);

-- Indexes for listing and maintenance
CREATE INDEX IF NOT EXISTS idx_documents_listing ON documents(listable, uploaded_at DESC);
CREATE INDEX IF NOT EXISTS idx_postings_document ON postings(document_id);
"#;

/// Tables that must exist for the database to count as initialized
pub const REQUIRED_TABLES: &[&str] = &["documents", "postings", "ingestion_log"];
