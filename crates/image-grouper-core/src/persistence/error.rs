use std::path::PathBuf;
use thiserror::Error;

/// Result of a hash cache operation
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Failures of the hash cache. None of them stop grouping; the provider
/// falls back to keeping hashes in memory.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The cache location could not be prepared
    #[error("Path error for {}: {1}", .0.display())]
    Path(PathBuf, String),

    #[error("Database initialization error: {0}")]
    Initialization(String),
}
