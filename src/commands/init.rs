//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::SqliteStore;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    /// Config file to write; defaults to `config.toml` under `base_dir`
    pub config_file: Option<PathBuf>,
    pub force: bool,
}

/// Write the default config and create the index database
pub async fn cmd_init(options: InitOptions) -> Result<Config> {
    let mut config = Config::default();
    config.init_paths(Some(options.base_dir));
    if let Some(config_file) = options.config_file {
        config.paths.config_file = config_file;
    }

    if config.paths.config_file.exists() && !options.force {
        return Err(Error::AlreadyInitialized(
            config.paths.base_dir.display().to_string(),
        ));
    }

    config.save()?;

    let store = SqliteStore::connect(&config).await?;
    store.init_schema().await?;

    info!("Initialized docsift at {:?}", config.paths.base_dir);
    Ok(config)
}

/// Print init summary to console
pub fn print_init(config: &Config) {
    println!("\n✓ docsift initialized\n");
    println!("Configuration: {}", config.paths.config_file.display());
    println!("Database: {}", config.paths.db_file.display());
    println!("\nNext: docsift ingest <file.pdf>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_config_and_db() {
        let tmp = TempDir::new().unwrap();
        let options = InitOptions {
            base_dir: tmp.path().to_path_buf(),
            config_file: None,
            force: false,
        };

        let config = cmd_init(options.clone()).await.unwrap();
        assert!(config.is_initialized());

        let store = SqliteStore::new(&config.paths.db_file).await.unwrap();
        assert!(store.is_initialized().await.unwrap());

        let err = cmd_init(options.clone()).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));

        let forced = InitOptions {
            force: true,
            ..options
        };
        assert!(cmd_init(forced).await.is_ok());
    }

    #[tokio::test]
    async fn test_init_writes_named_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_file = tmp.path().join("custom.toml");
        let options = InitOptions {
            base_dir: tmp.path().to_path_buf(),
            config_file: Some(config_file.clone()),
            force: false,
        };

        let config = cmd_init(options).await.unwrap();
        assert_eq!(config.paths.config_file, config_file);
        assert!(!tmp.path().join("config.toml").exists());

        let loaded = Config::load(&config_file).unwrap();
        assert!(loaded.is_initialized());
        assert_eq!(loaded.paths.db_file, config.paths.db_file);
    }
}
