//! Unindex command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::DocumentId;
use crate::maintenance::{delete_index_entries, DeleteStats};
use crate::store::PostingStore;
use tracing::info;

/// Remove postings for a document. Without explicit keywords every posting the
/// document currently has is removed.
pub async fn cmd_unindex(
    config: &Config,
    store: &dyn PostingStore,
    id: &DocumentId,
    keywords: Vec<String>,
) -> Result<DeleteStats> {
    if id.is_empty() {
        return Err(Error::Other("Document ID must not be empty".to_string()));
    }

    let keywords = if keywords.is_empty() {
        let indexed = store.keywords_for_document(id).await?;
        info!(document_id = %id, keywords = indexed.len(), "Removing all postings");
        indexed
    } else {
        keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    };

    delete_index_entries(store, id, &keywords, config.index.delete_batch_size).await
}

/// Print deletion stats to console
pub fn print_unindex_stats(id: &DocumentId, stats: &DeleteStats) {
    println!("\n🧹 Unindexed {}\n", id);
    println!("  Keywords requested: {}", stats.requested);
    println!("  Batches: {}", stats.batches);
    println!("  Postings removed: {}", stats.removed);
}
