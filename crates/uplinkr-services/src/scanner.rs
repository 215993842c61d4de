//! Malware scanner boundary.

use async_trait::async_trait;
use std::path::Path;

/// Outcome of scanning one stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    Clean,
    /// Carries the signature name reported by the scanner
    Infected(String),
    /// The scanner itself failed; the file's status is unknown
    Error(String),
}

/// Trait for screening uploaded files before their metadata is committed
#[async_trait]
pub trait MalwareScanner: Send + Sync {
    async fn scan(&self, path: &Path) -> ScanResult;
}
