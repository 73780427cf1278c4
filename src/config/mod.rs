//! Configuration management for docsift
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ingestion and index maintenance settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Query engine settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Provenance settings for uploads
    #[serde(default)]
    pub storage: StorageConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Ingestion and index maintenance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Postings removed per batch call (at most 25)
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,

    /// Posting writes in flight during one ingestion
    #[serde(default = "default_write_concurrency")]
    pub write_concurrency: usize,

    /// Shorter tokens are dropped by the keyword extractor
    #[serde(default = "default_min_keyword_len")]
    pub min_keyword_len: usize,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size requested from the stores while draining
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Posting-list fetches in flight during one query
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Cap on returned results when the caller gives no limit
    #[serde(default)]
    pub default_limit: Option<usize>,
}

/// Storage provenance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Container label recorded as provenance for uploaded files
    #[serde(default = "default_container")]
    pub container: String,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for docsift data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            delete_batch_size: default_delete_batch_size(),
            write_concurrency: default_write_concurrency(),
            min_keyword_len: default_min_keyword_len(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            fetch_concurrency: default_fetch_concurrency(),
            default_limit: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
        }
    }
}

impl PathsConfig {
    /// Lay out the data files under a base directory
    pub fn under(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.toml"),
            db_file: base.join("index.db"),
            base_dir: base,
        }
    }
}

impl Config {
    /// Get the default base directory for docsift (~/.docsift, or $DOCSIFT_HOME)
    pub fn default_base_dir() -> PathBuf {
        if let Ok(home) = std::env::var("DOCSIFT_HOME") {
            if !home.trim().is_empty() {
                return PathBuf::from(home);
            }
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docsift")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig::under(base);
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            ..PathsConfig::under(base)
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Check if docsift is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.index.delete_batch_size == 0 || self.index.delete_batch_size > MAX_DELETE_BATCH {
            return Err(Error::Config(format!(
                "index.delete_batch_size must be between 1 and {}",
                MAX_DELETE_BATCH
            )));
        }

        if self.index.write_concurrency == 0 {
            return Err(Error::Config(
                "index.write_concurrency must be positive".to_string(),
            ));
        }

        if self.query.page_size == 0 {
            return Err(Error::Config("query.page_size must be positive".to_string()));
        }

        if self.query.fetch_concurrency == 0 {
            return Err(Error::Config(
                "query.fetch_concurrency must be positive".to_string(),
            ));
        }

        if self.query.default_limit == Some(0) {
            return Err(Error::Config(
                "query.default_limit must be positive when set".to_string(),
            ));
        }

        Ok(())
    }
}
