//! Shared wiring for the `uplinkr` binary: tracing setup, service
//! construction from [`Config`] and the upload path the CLI drives.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use uplinkr_core::models::FileDescriptor;
use uplinkr_core::Config;
use uplinkr_services::{
    ClamAVService, CleanupScheduler, CreateFileRequest, FileService, FileServiceConfig,
    JsonFileStore, LocalStorage, Storage, StoreAnalyticsRecorder,
};

/// Initialize tracing for the CLI.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("uplinkr=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Everything the subcommands need, built once from configuration
pub struct Services {
    pub config: Config,
    pub storage: Arc<LocalStorage>,
    pub files: Arc<FileService>,
    pub scheduler: Arc<CleanupScheduler>,
}

pub async fn build_services(config: Config) -> anyhow::Result<Services> {
    let storage = Arc::new(
        LocalStorage::new(&config.upload_dir)
            .await
            .context("Failed to prepare upload directory")?,
    );
    let store = Arc::new(
        JsonFileStore::open(&config.data_path, config.analytics_capacity)
            .await
            .with_context(|| {
                format!("Failed to open file store at {}", config.data_path.display())
            })?,
    );
    let analytics = Arc::new(StoreAnalyticsRecorder::new(store.clone()));

    let mut files = FileService::new(
        store.clone(),
        storage.clone(),
        analytics,
        FileServiceConfig::from_config(&config),
    );
    if config.clamav.enabled {
        tracing::info!(
            host = %config.clamav.host,
            port = config.clamav.port,
            fail_closed = config.clamav.fail_closed,
            "ClamAV screening enabled"
        );
        if !config.clamav.fail_closed {
            tracing::warn!(
                "CLAMAV_FAIL_CLOSED=false: uploads are accepted unscanned while ClamAV is unreachable"
            );
        }
        files = files.with_scanner(Arc::new(ClamAVService::from_config(&config.clamav)));
    }

    let scheduler = CleanupScheduler::new(store, storage.clone(), files.gate().clone())
        .with_interval(Duration::from_secs(config.cleanup_interval_secs));

    Ok(Services {
        config,
        storage,
        files: Arc::new(files),
        scheduler: Arc::new(scheduler),
    })
}

/// Options accepted by `uplinkr upload`
#[derive(Debug, Default, Clone)]
pub struct UploadOptions {
    pub expiry: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub mime_type: Option<String>,
}

/// Store a local file and register it. Oversized files are refused before
/// anything is written.
pub async fn upload_file(
    services: &Services,
    path: &Path,
    options: UploadOptions,
) -> anyhow::Result<FileDescriptor> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    if metadata.len() > services.config.max_file_size_bytes {
        anyhow::bail!(
            "{} is {} bytes; the limit is {} bytes",
            path.display(),
            metadata.len(),
            services.config.max_file_size_bytes
        );
    }

    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let original_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime_type = options
        .mime_type
        .unwrap_or_else(|| guess_mime_type(path).to_string());

    let blob = services
        .storage
        .save(&original_name, &mime_type, data)
        .await
        .context("Failed to store upload")?;

    let mut request = CreateFileRequest::new(blob);
    request.expiry = options.expiry;
    request.custom_name = options.name;
    request.password = options.password;

    Ok(services.files.create_file_record(request).await?)
}

/// Content type for a path, from its extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        // Video and audio
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        // Documents
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}
