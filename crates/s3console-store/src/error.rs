//! Object store error types

use thiserror::Error;

/// Result type for object store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Object store error
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such bucket: {0}")]
    NoSuchBucket(String),

    #[error("no such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(String),

    #[error("bucket not empty: {0}")]
    BucketNotEmpty(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{op} failed: {message}")]
    Upstream { op: &'static str, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the error means the addressed bucket or object does not exist
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NoSuchKey { .. } | Self::NoSuchBucket(_))
    }
}
