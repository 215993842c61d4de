//! File lifecycle service.
//!
//! [`FileService`] is the façade transports call: it registers uploaded blobs,
//! authorizes downloads and answers info lookups. Any lookup that finds a
//! record whose blob has vanished deletes the orphaned record and reports
//! `NotFound`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use uplinkr_core::models::{
    AnalyticsEntry, DownloadContext, DownloadTarget, FileDescriptor, FileInfo, FileRecord,
    PasswordScheme, StoreStats, StoredBlob,
};
use uplinkr_core::{AppError, Config, ExpiryOption, LifecycleEvents, TracingLifecycleEvents};
use uplinkr_db::FileStore;
use uplinkr_storage::Storage;

use crate::analytics::AnalyticsRecorder;
use crate::gate::MutationGate;
use crate::password::{AccessDecision, AccessGuard};
use crate::scanner::{MalwareScanner, ScanResult};

/// Short id draws before giving up on finding a free one
pub const SHORT_ID_MAX_ATTEMPTS: usize = 5;

/// Settings the file service needs from the application configuration
#[derive(Clone, Debug)]
pub struct FileServiceConfig {
    pub base_url: String,
    /// Lowercased; `None` allows every type
    pub allowed_mime_types: Option<Vec<String>>,
    pub short_links_enabled: bool,
    pub short_id_length: usize,
}

impl FileServiceConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            allowed_mime_types: config.allowed_mime_types.clone(),
            short_links_enabled: config.short_links_enabled,
            short_id_length: config.short_id_length,
        }
    }

    fn mime_allowed(&self, mime_type: &str) -> bool {
        match &self.allowed_mime_types {
            None => true,
            Some(allowed) => {
                let mime_type = mime_type.trim().to_lowercase();
                allowed.iter().any(|t| *t == mime_type)
            }
        }
    }

    fn share_url(&self, id: &str) -> String {
        format!("{}/f/{}", self.base_url, id)
    }

    fn download_url(&self, id: &str) -> String {
        format!("{}/api/download/{}", self.base_url, id)
    }

    fn short_url(&self, short_id: &str) -> String {
        format!("{}/s/{}", self.base_url, short_id)
    }
}

impl Default for FileServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            allowed_mime_types: None,
            short_links_enabled: true,
            short_id_length: 6,
        }
    }
}

/// An upload to register
#[derive(Debug, Clone)]
pub struct CreateFileRequest {
    /// Already written to blob storage
    pub blob: StoredBlob,
    /// `1day`, `7days`, `1month` or `never`; absent means `never`
    pub expiry: Option<String>,
    /// Display name overriding the uploaded name
    pub custom_name: Option<String>,
    pub password: Option<String>,
}

impl CreateFileRequest {
    pub fn new(blob: StoredBlob) -> Self {
        Self {
            blob,
            expiry: None,
            custom_name: None,
            password: None,
        }
    }

    pub fn with_expiry(mut self, expiry: impl Into<String>) -> Self {
        self.expiry = Some(expiry.into());
        self
    }

    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// What a side-effect free lookup found
enum Lookup {
    Missing,
    /// Metadata present, blob gone
    Orphaned(FileRecord),
    Live(FileRecord, PathBuf),
}

pub struct FileService {
    store: Arc<dyn FileStore>,
    storage: Arc<dyn Storage>,
    analytics: Arc<dyn AnalyticsRecorder>,
    scanner: Option<Arc<dyn MalwareScanner>>,
    events: Arc<dyn LifecycleEvents>,
    gate: MutationGate,
    config: FileServiceConfig,
}

impl FileService {
    pub fn new(
        store: Arc<dyn FileStore>,
        storage: Arc<dyn Storage>,
        analytics: Arc<dyn AnalyticsRecorder>,
        config: FileServiceConfig,
    ) -> Self {
        Self {
            store,
            storage,
            analytics,
            scanner: None,
            events: Arc::new(TracingLifecycleEvents),
            gate: MutationGate::new(),
            config,
        }
    }

    /// Screen every upload with `scanner` before committing it.
    pub fn with_scanner(mut self, scanner: Arc<dyn MalwareScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn LifecycleEvents>) -> Self {
        self.events = events;
        self
    }

    /// Share `gate` with other services mutating the same store.
    pub fn with_gate(mut self, gate: MutationGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn gate(&self) -> &MutationGate {
        &self.gate
    }

    /// Register an uploaded blob.
    ///
    /// Every rejection deletes the blob before returning, so a failed upload
    /// leaves nothing behind.
    #[tracing::instrument(skip(self, request), fields(storage_filename = %request.blob.storage_filename))]
    pub async fn create_file_record(
        &self,
        request: CreateFileRequest,
    ) -> Result<FileDescriptor, AppError> {
        let CreateFileRequest {
            blob,
            expiry,
            custom_name,
            password,
        } = request;

        let expiry = match ExpiryOption::parse_optional(expiry.as_deref()) {
            Ok(expiry) => expiry,
            Err(e) => return Err(self.reject(&blob, e).await),
        };

        if !self.config.mime_allowed(&blob.mime_type) {
            let err = AppError::Validation(format!("File type not allowed: {}", blob.mime_type));
            return Err(self.reject(&blob, err).await);
        }

        if let Err(e) = self.screen(&blob).await {
            return Err(self.reject(&blob, e).await);
        }

        let stored_password = match password.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(p) => match AccessGuard::hash_password(p) {
                Ok(stored) => Some(stored),
                Err(e) => return Err(self.reject(&blob, e).await),
            },
            None => None,
        };

        let now = Utc::now();
        let display_name = custom_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| blob.original_name.clone());

        let mut record = FileRecord {
            id: blob.file_id(),
            short_id: None,
            original_name: display_name,
            storage_filename: blob.storage_filename.clone(),
            mime_type: blob.mime_type.clone(),
            size_bytes: blob.size_bytes,
            uploaded_at: now,
            expires_at: expiry.expires_at(now),
            password_hash: None,
            password_salt: None,
            password_scheme: PasswordScheme::Argon2id,
            downloads: 0,
            created_at: now,
        };
        if let Some(stored) = stored_password {
            record.set_password(stored);
        }

        let _guard = self.gate.exclusive().await;

        if self.config.short_links_enabled {
            match self.unused_short_id().await {
                Ok(short_id) => record.short_id = Some(short_id),
                Err(e) => return Err(self.reject(&blob, e).await),
            }
        }

        if let Err(e) = self.store.insert(record.clone()).await {
            tracing::error!(error = %e, file_id = %record.id, "Failed to save file metadata");
            return Err(self.reject(&blob, AppError::from(e)).await);
        }

        self.events.file_created(
            &record.id,
            record.size_bytes,
            record.expires_at.is_some(),
            record.has_password(),
        );

        Ok(self.descriptor(&record))
    }

    /// Authorize a download and do its bookkeeping.
    ///
    /// Analytics and the download counter are best-effort: their failures are
    /// reported through the lifecycle hooks and never fail the download.
    #[tracing::instrument(skip(self, context), fields(file_id = %file_id))]
    pub async fn get_file_for_download(
        &self,
        file_id: &str,
        context: &DownloadContext,
    ) -> Result<DownloadTarget, AppError> {
        let _guard = self.gate.exclusive().await;
        let (record, path) = self.resolve_live(file_id).await?;

        match AccessGuard::authorize(&record, context.candidate_password())? {
            AccessDecision::Granted => {}
            AccessDecision::PasswordRequired => {
                self.events.download_denied(&record.id, "password_required");
                return Err(AppError::Unauthorized(
                    "Password required for this file".to_string(),
                ));
            }
            AccessDecision::InvalidPassword => {
                self.events.download_denied(&record.id, "invalid_password");
                return Err(AppError::Forbidden("Invalid password".to_string()));
            }
        }

        if let Err(e) = self.analytics.record(&record.id, context).await {
            self.events.analytics_failed(&record.id, &e.to_string());
        }
        if let Err(e) = self.store.increment_downloads(&record.id).await {
            self.events.analytics_failed(&record.id, &e.to_string());
        }

        self.events.download_authorized(&record.id);

        Ok(DownloadTarget {
            path,
            download_name: record.original_name,
            mime_type: record.mime_type,
            size_bytes: record.size_bytes,
        })
    }

    /// Public projection of a live record.
    #[tracing::instrument(skip(self), fields(file_id = %file_id))]
    pub async fn get_file_info(&self, file_id: &str) -> Result<FileInfo, AppError> {
        {
            let _shared = self.gate.shared().await;
            match self.lookup(file_id).await? {
                Lookup::Live(record, _) => return Ok(self.info(&record)),
                Lookup::Missing => return Err(not_found()),
                Lookup::Orphaned(_) => {}
            }
        }

        // Re-check under the exclusive side; the record may have changed
        // while no guard was held.
        let _guard = self.gate.exclusive().await;
        let (record, _) = self.resolve_live(file_id).await?;
        Ok(self.info(&record))
    }

    /// Look a file up by its short alias.
    pub async fn resolve_short_id(&self, short_id: &str) -> Result<FileInfo, AppError> {
        let record = self
            .store
            .get_by_short_id(short_id)
            .await?
            .ok_or_else(not_found)?;
        self.get_file_info(&record.id).await
    }

    /// Download events recorded for a file, oldest first.
    pub async fn file_analytics(&self, file_id: &str) -> Result<Vec<AnalyticsEntry>, AppError> {
        Ok(self.store.analytics_for(file_id).await?)
    }

    pub async fn stats(&self) -> Result<StoreStats, AppError> {
        Ok(self.store.stats().await?)
    }

    async fn screen(&self, blob: &StoredBlob) -> Result<(), AppError> {
        let Some(scanner) = &self.scanner else {
            return Ok(());
        };

        let path = self
            .storage
            .path(&blob.storage_filename)
            .map_err(|e| AppError::System(format!("Cannot locate upload for scanning: {}", e)))?;

        match scanner.scan(&path).await {
            ScanResult::Clean => Ok(()),
            ScanResult::Infected(name) => Err(AppError::Security(format!(
                "File rejected: malware detected ({})",
                name
            ))),
            ScanResult::Error(msg) => Err(AppError::System(format!(
                "Malware scan failed: {}",
                msg
            ))),
        }
    }

    /// Caller must hold the exclusive gate.
    async fn unused_short_id(&self) -> Result<String, AppError> {
        for _ in 0..SHORT_ID_MAX_ATTEMPTS {
            let candidate = generate_short_id(self.config.short_id_length);
            if !self.store.short_id_exists(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(short_id = %candidate, "Short id collision, retrying");
        }
        Err(AppError::System(format!(
            "No unused short id after {} attempts",
            SHORT_ID_MAX_ATTEMPTS
        )))
    }

    /// Delete a rejected upload's blob and hand back the rejection.
    async fn reject(&self, blob: &StoredBlob, err: AppError) -> AppError {
        if let Err(e) = self.storage.delete(&blob.storage_filename).await {
            tracing::error!(
                error = %e,
                storage_filename = %blob.storage_filename,
                "Failed to delete rejected upload"
            );
        }
        self.events
            .upload_rejected(&blob.storage_filename, err.error_type());
        err
    }

    async fn lookup(&self, file_id: &str) -> Result<Lookup, AppError> {
        let Some(record) = self.store.get(file_id).await? else {
            return Ok(Lookup::Missing);
        };

        let exists = self
            .storage
            .exists(&record.storage_filename)
            .await
            .map_err(|e| AppError::System(format!("Failed to check stored file: {}", e)))?;

        if !exists {
            return Ok(Lookup::Orphaned(record));
        }

        let path = self
            .storage
            .path(&record.storage_filename)
            .map_err(|e| AppError::System(format!("Failed to resolve stored file: {}", e)))?;
        Ok(Lookup::Live(record, path))
    }

    /// Lookup that purges orphaned metadata. Caller must hold the exclusive gate.
    async fn resolve_live(&self, file_id: &str) -> Result<(FileRecord, PathBuf), AppError> {
        match self.lookup(file_id).await? {
            Lookup::Live(record, path) => Ok((record, path)),
            Lookup::Missing => Err(not_found()),
            Lookup::Orphaned(record) => {
                match self.store.delete(&record.id).await {
                    Ok(_) => self.events.record_self_healed(&record.id),
                    Err(e) => tracing::error!(
                        error = %e,
                        file_id = %record.id,
                        "Failed to delete orphaned record"
                    ),
                }
                Err(not_found())
            }
        }
    }

    fn descriptor(&self, record: &FileRecord) -> FileDescriptor {
        FileDescriptor {
            id: record.id.clone(),
            name: record.original_name.clone(),
            size: record.size_bytes,
            mimetype: record.mime_type.clone(),
            url: self.config.share_url(&record.id),
            download_url: self.config.download_url(&record.id),
            short_url: record
                .short_id
                .as_deref()
                .map(|s| self.config.short_url(s)),
            expiry_date: record.expires_at,
            has_password: record.has_password(),
        }
    }

    fn info(&self, record: &FileRecord) -> FileInfo {
        FileInfo {
            file: self.descriptor(record),
            upload_date: record.uploaded_at,
            downloads: record.downloads,
        }
    }
}

fn not_found() -> AppError {
    AppError::NotFound("File not found".to_string())
}

fn generate_short_id(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
