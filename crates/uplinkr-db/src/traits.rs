use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uplinkr_core::models::{AnalyticsEntry, FileRecord, FileSummary, StoreStats};

use crate::error::StoreResult;

/// Durable map from file id to [`FileRecord`] plus a bounded analytics log
///
/// Implementations serialize all mutations (single writer) and never expose a
/// half-applied mutation to readers. A mutation that fails to persist leaves
/// the store exactly as it was.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<FileRecord>>;

    async fn get_by_short_id(&self, short_id: &str) -> StoreResult<Option<FileRecord>>;

    async fn short_id_exists(&self, short_id: &str) -> StoreResult<bool>;

    /// Insert a new record. Rejects a record whose id or short id is taken.
    async fn insert(&self, record: FileRecord) -> StoreResult<()>;

    /// Remove a record, returning whether one was removed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Bump the download counter, returning the new count (`None` if the
    /// record is gone).
    async fn increment_downloads(&self, id: &str) -> StoreResult<Option<u64>>;

    /// Append to the analytics log, dropping the oldest entries beyond capacity.
    async fn append_analytics(&self, entry: AnalyticsEntry) -> StoreResult<()>;

    /// Records whose non-null expiry is at or before `now`.
    async fn expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<FileRecord>>;

    /// All records, newest first.
    async fn list(&self) -> StoreResult<Vec<FileRecord>>;

    /// Analytics entries for one file, oldest first.
    async fn analytics_for(&self, file_id: &str) -> StoreResult<Vec<AnalyticsEntry>>;

    async fn stats(&self) -> StoreResult<StoreStats> {
        let files = self.list().await?;
        Ok(StoreStats {
            total_files: files.len(),
            total_size: files.iter().map(|f| f.size_bytes).sum(),
            total_downloads: files.iter().map(|f| f.downloads).sum(),
            files: files.iter().map(FileSummary::from).collect(),
        })
    }
}
