use crate::keys::generate_storage_filename;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uplinkr_core::models::StoredBlob;

/// Attempts at finding an unused storage filename before giving up
const MAX_NAME_ATTEMPTS: usize = 5;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`, creating the
    /// directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create upload directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert a storage filename to a path inside the upload directory.
    ///
    /// Blobs are stored flat, so anything that could name another directory
    /// is rejected.
    fn filename_to_path(&self, storage_filename: &str) -> StorageResult<PathBuf> {
        if storage_filename.is_empty()
            || storage_filename.contains("..")
            || storage_filename.contains('/')
            || storage_filename.contains('\\')
            || storage_filename.starts_with('.')
        {
            return Err(StorageError::InvalidFilename(storage_filename.to_string()));
        }

        Ok(self.base_path.join(storage_filename))
    }

    async fn write_new(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(data).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn save(
        &self,
        original_name: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<StoredBlob> {
        let start = std::time::Instant::now();
        let size = data.len() as u64;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let storage_filename = generate_storage_filename(original_name);
            let path = self.filename_to_path(&storage_filename)?;

            match self.write_new(&path, &data).await {
                Ok(()) => {
                    tracing::info!(
                        path = %path.display(),
                        storage_filename = %storage_filename,
                        size_bytes = size,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Local storage write successful"
                    );

                    return Ok(StoredBlob {
                        storage_filename,
                        original_name: original_name.to_string(),
                        mime_type: mime_type.to_string(),
                        size_bytes: size,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(
                        storage_filename = %storage_filename,
                        "Storage filename collision, retrying"
                    );
                }
                Err(e) => {
                    // A partially written file must not outlive the failed save.
                    let _ = fs::remove_file(&path).await;
                    return Err(StorageError::WriteFailed(format!(
                        "Failed to write file {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Err(StorageError::WriteFailed(format!(
            "No free storage filename after {} attempts",
            MAX_NAME_ATTEMPTS
        )))
    }

    async fn delete(&self, storage_filename: &str) -> StorageResult<()> {
        let path = self.filename_to_path(storage_filename)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    storage_filename = %storage_filename,
                    "Local storage delete successful"
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, storage_filename: &str) -> StorageResult<bool> {
        let path = self.filename_to_path(storage_filename)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn path(&self, storage_filename: &str) -> StorageResult<PathBuf> {
        self.filename_to_path(storage_filename)
    }
}
