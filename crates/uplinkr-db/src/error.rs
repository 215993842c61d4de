use std::io;
use std::path::PathBuf;

use thiserror::Error;
use uplinkr_core::AppError;

/// Metadata store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read store {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Store document {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to persist store {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Duplicate file id: {0}")]
    DuplicateId(String),

    #[error("Duplicate short id: {0}")]
    DuplicateShortId(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Raised by store implementations that are not backed by the JSON
    /// document, such as test doubles.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::SystemWithSource {
            message: "Metadata store operation failed".to_string(),
            source: anyhow::Error::new(err),
        }
    }
}
