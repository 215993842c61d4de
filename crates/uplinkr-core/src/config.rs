//! Configuration module
//!
//! Environment-driven configuration for the file lifecycle service: storage
//! locations, public URLs, upload policy, malware screening and the cleanup
//! cadence.

use std::env;
use std::path::PathBuf;

// Common constants
const BASE_URL: &str = "http://localhost:3001";
const UPLOAD_DIR: &str = "./uploads";
const DATA_PATH: &str = "./data/database.json";
const MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;
const SHORT_ID_LENGTH: usize = 6;
const CLAMAV_PORT: u16 = 3310;
const CLAMAV_TIMEOUT_SECS: u64 = 30;
const CLEANUP_INTERVAL_SECS: u64 = 3600;
const ANALYTICS_CAPACITY: usize = 10_000;

/// ClamAV daemon settings
#[derive(Clone, Debug)]
pub struct ClamAVConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Treat scanner failures as errors instead of letting the upload through
    pub fail_closed: bool,
    pub timeout_secs: u64,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    /// Public origin used to build share, download and short URLs
    pub base_url: String,
    pub upload_dir: PathBuf,
    /// Location of the JSON metadata document
    pub data_path: PathBuf,
    pub max_file_size_bytes: u64,
    /// `None` allows every mime type
    pub allowed_mime_types: Option<Vec<String>>,
    pub short_links_enabled: bool,
    pub short_id_length: usize,
    pub clamav: ClamAVConfig,
    pub cleanup_interval_secs: u64,
    pub analytics_capacity: usize,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let parse_bool = |key: &str, default: bool| -> bool {
            lookup(key)
                .map(|v| v.trim().to_lowercase())
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };

        let allowed_mime_types = lookup("ALLOWED_MIME_TYPES")
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|types| !types.is_empty());

        let config = Config {
            environment,
            base_url: lookup("BASE_URL")
                .unwrap_or_else(|| BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            upload_dir: lookup("UPLOAD_DIR")
                .unwrap_or_else(|| UPLOAD_DIR.to_string())
                .into(),
            data_path: lookup("DATA_PATH")
                .unwrap_or_else(|| DATA_PATH.to_string())
                .into(),
            max_file_size_bytes: lookup("MAX_FILE_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_FILE_SIZE_BYTES),
            allowed_mime_types,
            short_links_enabled: parse_bool("SHORT_LINKS_ENABLED", true),
            short_id_length: lookup("SHORT_ID_LENGTH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(SHORT_ID_LENGTH),
            clamav: ClamAVConfig {
                enabled: parse_bool("CLAMAV_ENABLED", false),
                host: lookup("CLAMAV_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: lookup("CLAMAV_PORT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(CLAMAV_PORT),
                fail_closed: parse_bool("CLAMAV_FAIL_CLOSED", true),
                timeout_secs: lookup("CLAMAV_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(CLAMAV_TIMEOUT_SECS),
            },
            cleanup_interval_secs: lookup("CLEANUP_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CLEANUP_INTERVAL_SECS),
            analytics_capacity: lookup("ANALYTICS_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(ANALYTICS_CAPACITY),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "BASE_URL must start with http:// or https://"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE must be greater than zero"));
        }

        if self.short_links_enabled && self.short_id_length == 0 {
            return Err(anyhow::anyhow!(
                "SHORT_ID_LENGTH must be greater than zero when short links are enabled"
            ));
        }

        if self.cleanup_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "CLEANUP_INTERVAL_SECS must be greater than zero"
            ));
        }

        if self.analytics_capacity == 0 {
            return Err(anyhow::anyhow!("ANALYTICS_CAPACITY must be greater than zero"));
        }

        if self.clamav.enabled && self.clamav.host.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "CLAMAV_HOST must be set when CLAMAV_ENABLED=true"
            ));
        }

        Ok(())
    }
}
