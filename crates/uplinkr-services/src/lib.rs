//! Uplinkr Services Layer
//!
//! Business services for the file lifecycle: upload registration, password
//! gated downloads, self-healing lookups, download analytics and the periodic
//! expiry sweep. Transport layers (CLI, HTTP) call [`FileService`] and
//! [`CleanupScheduler`] and never touch the store or blob storage directly.

pub mod analytics;
#[cfg(feature = "clamav")]
pub mod clamav;
pub mod cleanup;
pub mod file_service;
pub mod gate;
pub mod password;
pub mod scanner;

pub use analytics::{AnalyticsRecorder, GeoResolver, StoreAnalyticsRecorder, UnknownGeoResolver};
#[cfg(feature = "clamav")]
pub use clamav::ClamAVService;
pub use cleanup::CleanupScheduler;
pub use file_service::{
    CreateFileRequest, FileService, FileServiceConfig, SHORT_ID_MAX_ATTEMPTS,
};
pub use gate::MutationGate;
pub use password::{AccessDecision, AccessGuard};
pub use scanner::{MalwareScanner, ScanResult};
pub use uplinkr_db::{FileStore, JsonFileStore, StoreError};
pub use uplinkr_storage::{LocalStorage, Storage, StorageError, StorageResult};
