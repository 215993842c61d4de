//! JSON document store
//!
//! The whole store lives in one JSON document shaped
//! `{ "files": { id: record }, "analytics": [entry, ...] }`. It is read once at
//! startup and rewritten whole on every mutation: the new document goes to a
//! sibling temp file which is then renamed over the old one, so a crash
//! mid-write loses at most that mutation.

use std::collections::{BTreeMap, VecDeque};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uplinkr_core::models::{AnalyticsEntry, FileRecord};

use crate::error::{StoreError, StoreResult};
use crate::traits::FileStore;

/// Analytics entries kept before the oldest are dropped
pub const DEFAULT_ANALYTICS_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    files: BTreeMap<String, FileRecord>,
    #[serde(default)]
    analytics: VecDeque<AnalyticsEntry>,
}

impl StoreDocument {
    fn short_id_taken(&self, short_id: &str) -> bool {
        self.files
            .values()
            .any(|r| r.short_id.as_deref() == Some(short_id))
    }

    fn trim_analytics(&mut self, capacity: usize) -> usize {
        let excess = self.analytics.len().saturating_sub(capacity);
        self.analytics.drain(..excess);
        excess
    }
}

/// Whether a mutation changed the document and must be persisted
enum Mutation<T> {
    Changed(T),
    Unchanged(T),
}

/// [`FileStore`] backed by a single JSON file
pub struct JsonFileStore {
    path: PathBuf,
    analytics_capacity: usize,
    state: RwLock<StoreDocument>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating an empty document if none exists.
    ///
    /// An unreadable or unparsable document is an error; it is never
    /// silently replaced.
    pub async fn open(path: impl Into<PathBuf>, analytics_capacity: usize) -> StoreResult<Self> {
        let path = path.into();
        let analytics_capacity = analytics_capacity.max(1);

        let document = match fs::read(&path).await {
            Ok(bytes) => {
                let mut document: StoreDocument =
                    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                let dropped = document.trim_analytics(analytics_capacity);
                for record in document.files.values() {
                    if let Err(reason) = record.validate() {
                        tracing::warn!(
                            file_id = %record.id,
                            reason = %reason,
                            "Loaded record violates invariants"
                        );
                    }
                }
                tracing::info!(
                    path = %path.display(),
                    files = document.files.len(),
                    analytics = document.analytics.len(),
                    analytics_dropped = dropped,
                    "File store loaded"
                );
                Some(document)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.clone(),
                    source,
                })
            }
        };

        let created = document.is_none();
        let store = JsonFileStore {
            path,
            analytics_capacity,
            state: RwLock::new(document.unwrap_or_default()),
        };

        if created {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::Persist {
                        path: store.path.clone(),
                        source,
                    })?;
            }
            store.persist(&StoreDocument::default()).await?;
            tracing::info!(path = %store.path.display(), "New file store created");
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn analytics_capacity(&self) -> usize {
        self.analytics_capacity
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("store.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn persist(&self, document: &StoreDocument) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(document)?;
        let temp = self.temp_path();
        let persist_err = |source| StoreError::Persist {
            path: self.path.clone(),
            source,
        };

        let write = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            fs::rename(&temp, &self.path).await
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&temp).await;
            return Err(persist_err(e));
        }
        Ok(())
    }

    /// Apply `f` to a copy of the document under the write lock; the copy
    /// replaces the live document only once it has been persisted.
    async fn mutate<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut StoreDocument) -> StoreResult<Mutation<T>>,
    {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();

        match f(&mut next)? {
            Mutation::Unchanged(out) => Ok(out),
            Mutation::Changed(out) => {
                self.persist(&next).await?;
                *guard = next;
                Ok(out)
            }
        }
    }
}

#[async_trait]
impl FileStore for JsonFileStore {
    async fn get(&self, id: &str) -> StoreResult<Option<FileRecord>> {
        Ok(self.state.read().await.files.get(id).cloned())
    }

    async fn get_by_short_id(&self, short_id: &str) -> StoreResult<Option<FileRecord>> {
        Ok(self
            .state
            .read()
            .await
            .files
            .values()
            .find(|r| r.short_id.as_deref() == Some(short_id))
            .cloned())
    }

    async fn short_id_exists(&self, short_id: &str) -> StoreResult<bool> {
        Ok(self.state.read().await.short_id_taken(short_id))
    }

    #[tracing::instrument(skip(self, record), fields(db.system = "json", db.operation = "insert", file_id = %record.id))]
    async fn insert(&self, record: FileRecord) -> StoreResult<()> {
        record.validate().map_err(StoreError::InvalidRecord)?;

        self.mutate(|doc| {
            if doc.files.contains_key(&record.id) {
                return Err(StoreError::DuplicateId(record.id.clone()));
            }
            if let Some(short_id) = record.short_id.as_deref() {
                if doc.short_id_taken(short_id) {
                    return Err(StoreError::DuplicateShortId(short_id.to_string()));
                }
            }
            doc.files.insert(record.id.clone(), record);
            Ok(Mutation::Changed(()))
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(db.system = "json", db.operation = "delete"))]
    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.mutate(|doc| {
            Ok(match doc.files.remove(id) {
                Some(_) => Mutation::Changed(true),
                None => Mutation::Unchanged(false),
            })
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(db.system = "json", db.operation = "increment_downloads"))]
    async fn increment_downloads(&self, id: &str) -> StoreResult<Option<u64>> {
        self.mutate(|doc| {
            Ok(match doc.files.get_mut(id) {
                Some(record) => {
                    record.downloads = record.downloads.saturating_add(1);
                    Mutation::Changed(Some(record.downloads))
                }
                None => Mutation::Unchanged(None),
            })
        })
        .await
    }

    #[tracing::instrument(skip(self, entry), fields(db.system = "json", db.operation = "append_analytics", file_id = %entry.file_id))]
    async fn append_analytics(&self, entry: AnalyticsEntry) -> StoreResult<()> {
        let capacity = self.analytics_capacity;
        self.mutate(|doc| {
            doc.analytics.push_back(entry);
            doc.trim_analytics(capacity);
            Ok(Mutation::Changed(()))
        })
        .await
    }

    async fn expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<FileRecord>> {
        Ok(self
            .state
            .read()
            .await
            .files
            .values()
            .filter(|r| r.is_expired(now))
            .cloned()
            .collect())
    }

    async fn list(&self) -> StoreResult<Vec<FileRecord>> {
        let mut files: Vec<FileRecord> = self.state.read().await.files.values().cloned().collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(files)
    }

    async fn analytics_for(&self, file_id: &str) -> StoreResult<Vec<AnalyticsEntry>> {
        Ok(self
            .state
            .read()
            .await
            .analytics
            .iter()
            .filter(|e| e.file_id == file_id)
            .cloned()
            .collect())
    }
}
