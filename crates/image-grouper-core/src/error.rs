use std::path::PathBuf;
use thiserror::Error;

use crate::persistence::PersistenceError;
use crate::types::Identity;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the image-grouper library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A condition setter received a value outside its declared range
    #[error("Invalid parameter for {condition}: {reason}")]
    InvalidParameter {
        condition: &'static str,
        reason: String,
    },

    /// An identity was handed to the engine that the attribute provider never saw
    #[error("Unknown identity: {0}")]
    UnknownIdentity(Identity),

    /// Hash cache failure
    #[error("Hash cache error: {0}")]
    Cache(#[from] PersistenceError),
}
