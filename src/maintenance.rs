//! Index maintenance: batched removal of a document's postings

use crate::config::MAX_DELETE_BATCH;
use crate::error::{Error, Result};
use crate::identity::DocumentId;
use crate::store::PostingStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Outcome of a completed deletion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteStats {
    /// Keywords passed in
    pub requested: usize,
    /// Batch calls issued
    pub batches: usize,
    /// Postings that existed and were removed
    pub removed: usize,
}

/// Remove the postings for `keywords` under one document.
///
/// Keywords are sent in sequential batches of at most `batch_size` (capped at the store
/// limit). The first failing batch stops the run. If nothing was applied yet the store
/// error is returned as is; otherwise `Error::BatchPartialFailure` reports how far the
/// run got. Applied batches stay applied.
pub async fn delete_index_entries(
    postings: &dyn PostingStore,
    document_id: &DocumentId,
    keywords: &[String],
    batch_size: usize,
) -> Result<DeleteStats> {
    if document_id.is_empty() || keywords.is_empty() {
        return Ok(DeleteStats::default());
    }

    let batch_size = batch_size.clamp(1, MAX_DELETE_BATCH);
    let total_batches = keywords.len().div_ceil(batch_size);
    let mut stats = DeleteStats {
        requested: keywords.len(),
        ..Default::default()
    };

    for (index, batch) in keywords.chunks(batch_size).enumerate() {
        match postings.delete_postings(document_id, batch).await {
            Ok(removed) => {
                stats.batches += 1;
                stats.removed += removed;
            }
            Err(e) if index == 0 => {
                warn!(document_id = %document_id, "First delete batch failed: {}", e);
                return Err(e);
            }
            Err(e) => {
                warn!(
                    document_id = %document_id,
                    applied = index,
                    total = total_batches,
                    "Delete batch failed after partial progress: {}",
                    e
                );
                return Err(Error::BatchPartialFailure {
                    document_id: document_id.to_string(),
                    applied_batches: index,
                    total_batches,
                    source: Box::new(e),
                });
            }
        }
    }

    info!(
        document_id = %document_id,
        batches = stats.batches,
        removed = stats.removed,
        "Deleted index entries"
    );
    Ok(stats)
}
