use crate::scanner::{MalwareScanner, ScanResult};
use async_trait::async_trait;
use clamav_client::{clean, Tcp};
use std::path::{Path, PathBuf};
use std::str;
use std::time::{Duration, Instant};
use uplinkr_core::ClamAVConfig;

/// Scans stored blobs through a clamd daemon over TCP
#[derive(Clone, Debug)]
pub struct ClamAVService {
    host: String,
    port: u16,
    fail_closed: bool,
    /// Timeout in seconds for each scan operation (default: 30)
    timeout_secs: u64,
}

impl ClamAVService {
    /// Create a new ClamAVService.
    ///
    /// # Arguments
    /// * `host` - ClamAV daemon hostname
    /// * `port` - ClamAV daemon port (typically 3310)
    /// * `fail_closed` - If true, treat scan failures/timeouts as errors; if false, allow (fail-open)
    pub fn new(host: String, port: u16, fail_closed: bool) -> Self {
        Self::with_timeout(host, port, fail_closed, 30)
    }

    /// Create with a custom scan timeout (for large files or slow ClamAV instances).
    pub fn with_timeout(host: String, port: u16, fail_closed: bool, timeout_secs: u64) -> Self {
        Self {
            host,
            port,
            fail_closed,
            timeout_secs,
        }
    }

    pub fn from_config(config: &ClamAVConfig) -> Self {
        Self::with_timeout(
            config.host.clone(),
            config.port,
            config.fail_closed,
            config.timeout_secs,
        )
    }

    /// Fail-open turns a scanner failure into a pass.
    fn on_failure(fail_closed: bool, error_msg: String) -> ScanResult {
        if fail_closed {
            ScanResult::Error(error_msg)
        } else {
            tracing::warn!(error = %error_msg, "ClamAV unavailable, continuing (fail-open)");
            ScanResult::Clean
        }
    }

    /// Pull the signature name out of a `stream: Eicar-Test-Signature FOUND` reply.
    fn virus_name(response_bytes: &[u8]) -> String {
        let response_str = str::from_utf8(response_bytes)
            .map(str::trim)
            .unwrap_or("unknown");
        if !response_str.contains("FOUND") {
            return "unknown".to_string();
        }
        response_str
            .split(':')
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string()
    }

    /// Scan a file on disk using the sync API inside spawn_blocking.
    pub async fn scan_file(&self, path: &Path) -> ScanResult {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = %self.port, path = %path.display(), "Starting ClamAV scan");
        let path: PathBuf = path.to_path_buf();
        let host = self.host.clone();
        let port = self.port;
        let fail_closed = self.fail_closed;
        let timeout_secs = self.timeout_secs;

        let result = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(move || {
                let address = format!("{}:{}", host, port);
                let connection = Tcp {
                    host_address: address.as_str(),
                };
                match clamav_client::scan_file(&path, connection, None) {
                    Ok(response_bytes) => match clean(&response_bytes) {
                        Ok(true) => {
                            tracing::info!(
                                duration_ms = start.elapsed().as_millis(),
                                "File scan completed: clean"
                            );
                            ScanResult::Clean
                        }
                        Ok(false) => {
                            let virus_name = Self::virus_name(&response_bytes);
                            tracing::warn!(
                                duration_ms = start.elapsed().as_millis(),
                                virus = %virus_name,
                                "File scan detected virus"
                            );
                            ScanResult::Infected(virus_name)
                        }
                        Err(e) => {
                            let error_msg = format!("Failed to parse ClamAV response: {}", e);
                            tracing::error!(error = %error_msg, "Failed to parse ClamAV response");
                            Self::on_failure(fail_closed, error_msg)
                        }
                    },
                    Err(e) => {
                        let error_msg = format!("ClamAV scan error: {}", e);
                        tracing::error!(error = %error_msg, "ClamAV scan failed");
                        Self::on_failure(fail_closed, error_msg)
                    }
                }
            }),
        )
        .await;

        match result {
            Ok(Ok(sr)) => sr,
            Ok(Err(e)) => {
                let error_msg = format!("ClamAV scan task join error: {}", e);
                tracing::error!(error = %error_msg, "ClamAV scan panicked");
                ScanResult::Error(error_msg)
            }
            Err(_) => {
                let error_msg = format!("ClamAV scan timeout (exceeded {} seconds)", timeout_secs);
                tracing::error!(error = %error_msg, "ClamAV scan timeout");
                Self::on_failure(fail_closed, error_msg)
            }
        }
    }
}

#[async_trait]
impl MalwareScanner for ClamAVService {
    async fn scan(&self, path: &Path) -> ScanResult {
        self.scan_file(path).await
    }
}
