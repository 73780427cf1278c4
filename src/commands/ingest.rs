//! Ingest command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{ensure_pdf, ContentType, TextExtractor};
use crate::identity::{check_duplicate, derive_document_id, DocumentId};
use crate::pipeline::Ingestor;
use crate::progress::add_progress_bar;
use crate::store::{AuditLog, Facets, MetadataStore, PostingStore, Provenance};
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options shared by single-file and directory ingestion
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Facets applied to every ingested file
    pub facets: Facets,
    /// Provenance container; falls back to the config, then the file's directory
    pub container: Option<String>,
    /// Re-ingest documents that are already indexed
    pub force: bool,
}

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    pub docs_indexed: usize,
    pub docs_skipped: usize,
    pub docs_failed: usize,
    pub document_ids: Vec<String>,
    pub errors: Vec<String>,
}

/// Ingest a single PDF
pub async fn cmd_ingest_file<S>(
    config: &Config,
    store: &S,
    extractor: &dyn TextExtractor,
    path: &Path,
    options: &IngestOptions,
) -> Result<DocumentId>
where
    S: MetadataStore + PostingStore + AuditLog,
{
    let canonical_path = path
        .canonicalize()
        .map_err(|e| Error::InvalidPath(format!("{}: {}", path.display(), e)))?;

    let content = std::fs::read(&canonical_path)?;
    ensure_pdf(&canonical_path, &content)?;

    if !options.force {
        check_duplicate(store, &derive_document_id(&content)).await?;
    }

    let provenance = provenance_for(config, &canonical_path, options.container.as_deref())?;
    Ingestor::from_config(config, store, extractor)
        .ingest(&content, provenance, options.facets.clone())
        .await
}

/// Ingest every PDF under a directory. Duplicates are skipped; other failures are
/// collected and the walk continues.
pub async fn cmd_ingest_dir<S>(
    config: &Config,
    store: &S,
    extractor: &dyn TextExtractor,
    path: &Path,
    options: &IngestOptions,
) -> Result<IngestStats>
where
    S: MetadataStore + PostingStore + AuditLog,
{
    let canonical_path = path
        .canonicalize()
        .map_err(|e| Error::InvalidPath(format!("{}: {}", path.display(), e)))?;
    if !canonical_path.is_dir() {
        return Err(Error::InvalidPath(format!(
            "{}: not a directory",
            canonical_path.display()
        )));
    }

    info!("Ingesting directory: {}", canonical_path.display());

    let files = collect_pdfs(&canonical_path);
    info!("Found {} PDF files to process", files.len());

    let mut stats = IngestStats::default();
    let file_progress = start_progress_bar(files.len(), "Indexing documents");

    for file_path in files {
        match cmd_ingest_file(config, store, extractor, &file_path, options).await {
            Ok(id) => {
                stats.docs_indexed += 1;
                stats.document_ids.push(id.to_string());
            }
            Err(Error::DuplicateDocument(reason)) => {
                debug!("Skipping {}: already indexed as {}", file_path.display(), reason);
                stats.docs_skipped += 1;
            }
            Err(e) => {
                let error_msg = format!("{}: {}", file_path.display(), e);
                warn!("{}", error_msg);
                stats.errors.push(error_msg);
                stats.docs_failed += 1;
            }
        }

        advance_progress(&file_progress);
    }

    finish_progress(file_progress, "Documents processed");

    info!(
        "Ingestion complete: {} indexed, {} skipped, {} failed",
        stats.docs_indexed, stats.docs_skipped, stats.docs_failed
    );

    Ok(stats)
}

fn collect_pdfs(root: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(|entry| entry.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path().to_path_buf())
        .filter(|p| ContentType::detect(p) == ContentType::Pdf)
        .collect();
    files.sort();
    files
}

/// Provenance for a local file: the file name is both the source name and the key
fn provenance_for(config: &Config, path: &Path, container: Option<&str>) -> Result<Provenance> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::InvalidPath(format!("{}: no file name", path.display())))?;

    let container = container
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| {
            let configured = config.storage.container.trim();
            (!configured.is_empty()).then(|| configured.to_string())
        })
        .or_else(|| path.parent().map(|p| p.display().to_string()))
        .unwrap_or_default();

    Ok(Provenance::new(file_name, file_name, container))
}

fn start_progress_bar(len: usize, message: &str) -> Option<ProgressBar> {
    if len == 0 {
        return None;
    }

    let pb = add_progress_bar(len as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn advance_progress(pb: &Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}

fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Print single-file ingestion result to console
pub fn print_ingest_file(path: &Path, id: &DocumentId) {
    println!("✓ Indexed {}", path.display());
    println!("  Document ID: {}", id);
}

/// Print directory ingestion stats to console
pub fn print_ingest_stats(stats: &IngestStats) {
    println!("\n✓ Ingestion complete\n");
    println!("  Indexed: {}", stats.docs_indexed);
    println!("  Skipped (already indexed): {}", stats.docs_skipped);
    println!("  Failed: {}", stats.docs_failed);

    if !stats.errors.is_empty() {
        println!("\nErrors:");
        for error in &stats.errors {
            println!("  • {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testing::{PlainTextExtractor, CORRUPT_MARKER};
    use crate::store::testing::MemoryStore;
    use tempfile::TempDir;

    fn config() -> Config {
        Config::default()
    }

    #[tokio::test]
    async fn test_ingest_file_rejects_duplicates_unless_forced() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("plan.pdf");
        let renamed = tmp.path().join("plan-copy.pdf");
        std::fs::write(&first, "%PDF-1.4 plan plan budget").unwrap();
        std::fs::write(&renamed, "%PDF-1.4 plan plan budget").unwrap();

        let store = MemoryStore::new();
        let options = IngestOptions::default();
        let id = cmd_ingest_file(&config(), &store, &PlainTextExtractor, &first, &options)
            .await
            .unwrap();

        let err = cmd_ingest_file(&config(), &store, &PlainTextExtractor, &renamed, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDocument(_)));
        assert_eq!(store.documents().len(), 1);

        let forced = IngestOptions {
            force: true,
            ..Default::default()
        };
        let again = cmd_ingest_file(&config(), &store, &PlainTextExtractor, &renamed, &forced)
            .await
            .unwrap();
        assert_eq!(id, again);
        assert_eq!(store.documents().len(), 1);
        assert_eq!(store.documents()[0].provenance.source_name, "plan-copy.pdf");
    }

    #[tokio::test]
    async fn test_ingest_file_rejects_non_pdf() {
        let tmp = TempDir::new().unwrap();
        let notes = tmp.path().join("notes.txt");
        std::fs::write(&notes, "%PDF-1.4 plan").unwrap();
        let fake = tmp.path().join("fake.pdf");
        std::fs::write(&fake, "plain text").unwrap();

        let store = MemoryStore::new();
        for path in [&notes, &fake] {
            let err = cmd_ingest_file(
                &config(),
                &store,
                &PlainTextExtractor,
                path,
                &IngestOptions::default(),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, Error::UnsupportedContentType(_)));
        }
        // Rejected at the boundary, so nothing is audited
        assert!(store.audit_entries().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_dir_collects_outcomes() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), "%PDF-1.4 budget").unwrap();
        std::fs::write(tmp.path().join("b.pdf"), "%PDF-1.4 budget").unwrap();
        std::fs::write(
            tmp.path().join("c.pdf"),
            format!("%PDF-1.4 {}", CORRUPT_MARKER),
        )
        .unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested/d.PDF"), "%PDF-1.4 travel").unwrap();
        std::fs::write(tmp.path().join("readme.md"), "# budget").unwrap();

        let store = MemoryStore::new();
        let stats = cmd_ingest_dir(
            &config(),
            &store,
            &PlainTextExtractor,
            tmp.path(),
            &IngestOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(stats.docs_indexed, 2);
        assert_eq!(stats.docs_skipped, 1);
        assert_eq!(stats.docs_failed, 1);
        assert!(stats.errors[0].contains("c.pdf"));
        assert_eq!(store.documents().len(), 2);
    }

    #[test]
    fn test_provenance_container_fallbacks() {
        let path = Path::new("/srv/uploads/guide.pdf");

        let p = provenance_for(&config(), path, Some("s3://bucket")).unwrap();
        assert_eq!(p.storage_container, "s3://bucket");
        assert_eq!(p.source_name, "guide.pdf");

        let mut configured = config();
        configured.storage.container = "s3://configured".to_string();
        let p = provenance_for(&configured, path, None).unwrap();
        assert_eq!(p.storage_container, "s3://configured");

        let p = provenance_for(&config(), path, Some("  ")).unwrap();
        assert_eq!(p.storage_container, "/srv/uploads");
        assert_eq!(p.link(), "/srv/uploads/guide.pdf");
    }
}
