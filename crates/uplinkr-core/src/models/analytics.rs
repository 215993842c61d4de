use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder geography when the requester cannot be located
pub const UNKNOWN_LOCATION: &str = "Unknown";
/// Referrer recorded when the request carried none
pub const DIRECT_REFERRER: &str = "direct";
/// User agent recorded when the request carried none
pub const UNKNOWN_USER_AGENT: &str = "unknown";

/// One authorized download, as appended to the analytics log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEntry {
    pub file_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ip: Option<String>,
    pub country: String,
    pub city: String,
    pub referrer: String,
    pub user_agent: String,
}

/// Approximate requester location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    pub country: String,
    pub city: String,
}

impl GeoLocation {
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN_LOCATION.to_string(),
            city: UNKNOWN_LOCATION.to_string(),
        }
    }
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self::unknown()
    }
}
