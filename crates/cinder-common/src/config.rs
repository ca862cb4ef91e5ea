//! Database configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_CHECKPOINT_THRESHOLD, DEFAULT_DATA_FILE, DEFAULT_WAL_FILE,
};

/// Configuration for a database manager instance.
///
/// # Example
///
/// ```rust
/// use cinder_common::config::DatabaseConfig;
///
/// let config = DatabaseConfig::default()
///     .with_checkpoint_threshold(64 * 1024)
///     .with_cache_capacity(128);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the data file.
    pub data_path: PathBuf,

    /// Path of the write-ahead log file.
    pub wal_path: PathBuf,

    /// Log size, in bytes, at which a checkpoint is triggered.
    pub checkpoint_threshold_bytes: u64,

    /// Maximum number of pages held in the in-memory cache.
    pub cache_capacity_pages: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_FILE),
            wal_path: PathBuf::from(DEFAULT_WAL_FILE),
            checkpoint_threshold_bytes: DEFAULT_CHECKPOINT_THRESHOLD,
            cache_capacity_pages: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl DatabaseConfig {
    /// Creates a configuration with the default file names under `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            data_path: dir.join(DEFAULT_DATA_FILE),
            wal_path: dir.join(DEFAULT_WAL_FILE),
            ..Default::default()
        }
    }

    /// Sets the data file path.
    #[must_use]
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Sets the write-ahead log path.
    #[must_use]
    pub fn with_wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.wal_path = path.into();
        self
    }

    /// Sets the checkpoint threshold in bytes.
    #[must_use]
    pub fn with_checkpoint_threshold(mut self, bytes: u64) -> Self {
        self.checkpoint_threshold_bytes = bytes;
        self
    }

    /// Sets the cache capacity in pages.
    #[must_use]
    pub fn with_cache_capacity(mut self, pages: usize) -> Self {
        self.cache_capacity_pages = pages;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_capacity_pages == 0 {
            return Err("cache capacity must be at least one page".to_string());
        }

        if self.checkpoint_threshold_bytes == 0 {
            return Err("checkpoint threshold must be positive".to_string());
        }

        if self.data_path == self.wal_path {
            return Err("data file and log file must be distinct".to_string());
        }

        Ok(())
    }
}
