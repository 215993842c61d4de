use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::interval;
use uplinkr_core::models::{FileRecord, SweepReport};
use uplinkr_core::{AppError, LifecycleEvents, TracingLifecycleEvents};
use uplinkr_db::FileStore;
use uplinkr_storage::Storage;

use crate::gate::MutationGate;

/// Default time between sweeps
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Deletes expired files, blob first and then metadata
#[derive(Clone)]
pub struct CleanupScheduler {
    store: Arc<dyn FileStore>,
    storage: Arc<dyn Storage>,
    gate: MutationGate,
    events: Arc<dyn LifecycleEvents>,
    interval: Duration,
}

impl CleanupScheduler {
    /// `gate` must be the one the file service mutating the same store uses.
    pub fn new(store: Arc<dyn FileStore>, storage: Arc<dyn Storage>, gate: MutationGate) -> Self {
        Self {
            store,
            storage,
            gate,
            events: Arc::new(TracingLifecycleEvents),
            interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn LifecycleEvents>) -> Self {
        self.events = events;
        self
    }

    /// Start the background cleanup task. The first sweep runs immediately.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut cleanup_interval = interval(self.interval);

            loop {
                cleanup_interval.tick().await;

                tracing::debug!("Starting scheduled cleanup of expired files");

                if let Err(e) = self.sweep(Utc::now()).await {
                    tracing::error!(error = %e, "Cleanup task failed");
                }
            }
        })
    }

    /// Delete every record whose expiry is at or before `now`.
    ///
    /// Records are handled one at a time; a failure is counted and the sweep
    /// moves on. A record whose blob cannot be deleted keeps its metadata so
    /// the next sweep retries it.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "expire_all"))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let expired = self.store.expired(now).await?;
        let mut report = SweepReport {
            examined: expired.len(),
            ..SweepReport::default()
        };

        for record in expired {
            match self.expire(&record, now).await {
                Ok(true) => report.deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        error = %e,
                        file_id = %record.id,
                        "Failed to delete expired file"
                    );
                }
            }
        }

        self.events
            .sweep_completed(report.examined, report.deleted, report.failed);

        Ok(report)
    }

    /// Returns whether this call removed the record.
    async fn expire(&self, record: &FileRecord, now: DateTime<Utc>) -> Result<bool, AppError> {
        let _guard = self.gate.exclusive().await;

        // A download may have self-healed the record since the listing.
        match self.store.get(&record.id).await? {
            Some(current) if current.is_expired(now) => {}
            _ => return Ok(false),
        }

        tracing::info!(
            file_id = %record.id,
            storage_filename = %record.storage_filename,
            expires_at = ?record.expires_at,
            "Deleting expired file"
        );

        self.storage
            .delete(&record.storage_filename)
            .await
            .map_err(|e| AppError::System(format!("Failed to delete expired blob: {}", e)))?;

        let removed = self.store.delete(&record.id).await?;
        if removed {
            self.events.record_expired(&record.id);
        }
        Ok(removed)
    }
}
