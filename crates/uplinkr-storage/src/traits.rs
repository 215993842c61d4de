//! Storage abstraction trait
//!
//! This module defines the Storage trait that every blob backend implements.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use uplinkr_core::models::StoredBlob;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage filename: {0}")]
    InvalidFilename(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Blob store for uploaded file contents
///
/// Blobs are addressed by storage filename. The file service never reads or
/// streams bytes itself; it only checks presence, resolves paths for the
/// caller and deletes blobs that should no longer exist.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under a freshly generated storage filename.
    async fn save(
        &self,
        original_name: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<StoredBlob>;

    /// Delete a blob. Deleting a missing blob succeeds.
    async fn delete(&self, storage_filename: &str) -> StorageResult<()>;

    async fn exists(&self, storage_filename: &str) -> StorageResult<bool>;

    /// Filesystem path a blob is (or would be) stored at
    fn path(&self, storage_filename: &str) -> StorageResult<PathBuf>;
}
