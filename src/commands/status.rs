//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::{IndexStats, SqliteStore};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub pdf_support: bool,
    pub stats: IndexStats,
}

/// Get index status
pub async fn cmd_status(config: &Config, store: &SqliteStore) -> Result<StatusInfo> {
    info!("Getting status");

    let stats = store.stats().await?;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        pdf_support: cfg!(feature = "pdf"),
        stats,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 docsift Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!(
        "PDF support: {}",
        if status.pdf_support { "✓ enabled" } else { "✗ not compiled in" }
    );
    println!("\nIndex Stats:");
    println!("  Documents: {}", status.stats.document_count);
    println!("  Keywords: {}", status.stats.keyword_count);
    println!("  Postings: {}", status.stats.posting_count);
    println!("  Ingestion log entries: {}", status.stats.log_count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_on_empty_index() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));

        let store = SqliteStore::new(&config.paths.db_file).await.unwrap();
        let status = cmd_status(&config, &store).await.unwrap();
        assert_eq!(status.stats.document_count, 0);
        assert_eq!(status.stats.posting_count, 0);
        assert!(status.db_path.ends_with("index.db"));
    }
}
