use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for scanning and grouping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Whether directories are searched recursively
    pub search_subfolders: bool,

    /// Upper bound on the number of files taken from one scan
    pub max_files: Option<usize>,

    /// Whether to keep perceptual hashes in a persistent cache
    pub use_cache: bool,

    /// Path to the hash cache database
    pub cache_path: Option<PathBuf>,

    /// Number of threads to use for batch work (0 = auto)
    pub threads: usize,

    /// Whether batch operations draw a progress bar
    pub show_progress: bool,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_subfolders: false,
            max_files: Some(3000),
            use_cache: true,
            cache_path: Some(PathBuf::from("image-grouper.db")),
            threads: 0, // Auto
            show_progress: false,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Make sure we have a cache path if the cache is enabled
        if self.use_cache && self.cache_path.is_none() {
            return Err(Error::Configuration(
                "Cache path must be specified if the cache is enabled".to_string(),
            ));
        }

        if self.max_files == Some(0) {
            return Err(Error::Configuration(
                "max_files must be at least 1 when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Effective worker count for batch operations
    pub fn worker_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}
