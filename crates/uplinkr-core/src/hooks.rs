//! Lifecycle hooks
//!
//! The file service and cleanup scheduler report notable lifecycle events
//! through [`LifecycleEvents`] instead of logging directly. Embedders can plug
//! in their own sink (metrics, audit trail); the default emits structured
//! `tracing` events.

/// Receiver for file lifecycle events
///
/// Every method has an empty default so implementors only override what they
/// care about. Implementations must not block.
pub trait LifecycleEvents: Send + Sync {
    /// A record was committed for a freshly uploaded blob
    fn file_created(&self, _file_id: &str, _size_bytes: u64, _expires: bool, _protected: bool) {}

    /// An upload was refused before its metadata was committed
    fn upload_rejected(&self, _storage_filename: &str, _reason: &str) {}

    fn download_authorized(&self, _file_id: &str) {}

    /// `reason` is either `password_required` or `invalid_password`
    fn download_denied(&self, _file_id: &str, _reason: &str) {}

    /// Metadata was purged because its backing blob is gone
    fn record_self_healed(&self, _file_id: &str) {}

    fn record_expired(&self, _file_id: &str) {}

    fn sweep_completed(&self, _examined: usize, _deleted: usize, _failed: usize) {}

    /// Best-effort download bookkeeping failed
    fn analytics_failed(&self, _file_id: &str, _error: &str) {}
}

/// Emits every event as a structured `tracing` event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLifecycleEvents;

impl LifecycleEvents for TracingLifecycleEvents {
    fn file_created(&self, file_id: &str, size_bytes: u64, expires: bool, protected: bool) {
        tracing::info!(
            file_id = %file_id,
            size_bytes = size_bytes,
            expires = expires,
            protected = protected,
            "File record created"
        );
    }

    fn upload_rejected(&self, storage_filename: &str, reason: &str) {
        tracing::warn!(
            storage_filename = %storage_filename,
            reason = %reason,
            "Upload rejected, blob removed"
        );
    }

    fn download_authorized(&self, file_id: &str) {
        tracing::debug!(file_id = %file_id, "Download authorized");
    }

    fn download_denied(&self, file_id: &str, reason: &str) {
        tracing::info!(file_id = %file_id, reason = %reason, "Download denied");
    }

    fn record_self_healed(&self, file_id: &str) {
        tracing::warn!(file_id = %file_id, "Blob missing, removed orphaned record");
    }

    fn record_expired(&self, file_id: &str) {
        tracing::info!(file_id = %file_id, "Deleted expired file");
    }

    fn sweep_completed(&self, examined: usize, deleted: usize, failed: usize) {
        if examined > 0 {
            tracing::info!(
                examined = examined,
                deleted = deleted,
                failed = failed,
                "Cleanup sweep completed"
            );
        } else {
            tracing::debug!("Cleanup sweep found no expired files");
        }
    }

    fn analytics_failed(&self, file_id: &str, error: &str) {
        tracing::warn!(file_id = %file_id, error = %error, "Download bookkeeping failed");
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLifecycleEvents;

impl LifecycleEvents for NoOpLifecycleEvents {}
