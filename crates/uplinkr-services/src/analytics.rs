//! Download analytics.
//!
//! Each authorized download becomes one [`AnalyticsEntry`]. Geography comes
//! from a pluggable [`GeoResolver`]; real geo-IP lookups live outside this
//! crate.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uplinkr_core::models::{
    AnalyticsEntry, DownloadContext, GeoLocation, DIRECT_REFERRER, UNKNOWN_USER_AGENT,
};
use uplinkr_core::AppError;
use uplinkr_db::FileStore;

/// Resolves a client address to an approximate location
#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve(&self, ip: Option<&str>) -> GeoLocation;
}

/// Resolver that knows nothing; every address is `Unknown`
#[derive(Debug, Default, Clone, Copy)]
pub struct UnknownGeoResolver;

#[async_trait]
impl GeoResolver for UnknownGeoResolver {
    async fn resolve(&self, _ip: Option<&str>) -> GeoLocation {
        GeoLocation::unknown()
    }
}

/// Sink for download events
#[async_trait]
pub trait AnalyticsRecorder: Send + Sync {
    async fn record(&self, file_id: &str, context: &DownloadContext) -> Result<(), AppError>;
}

/// Appends download events to the file store's analytics log
pub struct StoreAnalyticsRecorder {
    store: Arc<dyn FileStore>,
    geo: Arc<dyn GeoResolver>,
    /// Last timestamp handed out; entries never go back in time
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl StoreAnalyticsRecorder {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self::with_geo_resolver(store, Arc::new(UnknownGeoResolver))
    }

    pub fn with_geo_resolver(store: Arc<dyn FileStore>, geo: Arc<dyn GeoResolver>) -> Self {
        Self {
            store,
            geo,
            last_timestamp: Mutex::new(None),
        }
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let ts = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(ts);
        ts
    }

    fn non_blank(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl AnalyticsRecorder for StoreAnalyticsRecorder {
    #[tracing::instrument(skip(self, context), fields(file_id = %file_id))]
    async fn record(&self, file_id: &str, context: &DownloadContext) -> Result<(), AppError> {
        let ip = Self::non_blank(&context.ip);
        let location = self.geo.resolve(ip).await;

        let entry = AnalyticsEntry {
            file_id: file_id.to_string(),
            timestamp: self.next_timestamp(),
            ip: ip.map(str::to_string),
            country: location.country,
            city: location.city,
            referrer: Self::non_blank(&context.referrer)
                .unwrap_or(DIRECT_REFERRER)
                .to_string(),
            user_agent: Self::non_blank(&context.user_agent)
                .unwrap_or(UNKNOWN_USER_AGENT)
                .to_string(),
        };

        self.store.append_analytics(entry).await?;
        tracing::debug!("Download recorded");
        Ok(())
    }
}
