use chrono::{DateTime, Utc};
use serde::Serialize;

use super::FileRecord;

/// Listing entry for one stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    pub name: String,
    pub size: u64,
    pub mimetype: String,
    pub downloads: u64,
    pub upload_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub has_password: bool,
}

impl From<&FileRecord> for FileSummary {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id.clone(),
            short_id: record.short_id.clone(),
            name: record.original_name.clone(),
            size: record.size_bytes,
            mimetype: record.mime_type.clone(),
            downloads: record.downloads,
            upload_date: record.uploaded_at,
            expiry_date: record.expires_at,
            has_password: record.has_password(),
        }
    }
}

/// Aggregate store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_files: usize,
    pub total_size: u64,
    pub total_downloads: u64,
    /// Newest first
    pub files: Vec<FileSummary>,
}

/// Outcome of one expiry sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired records selected for deletion
    pub examined: usize,
    pub deleted: usize,
    pub failed: usize,
}
