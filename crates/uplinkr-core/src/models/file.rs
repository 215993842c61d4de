use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Digest scheme a stored password hash was produced with.
///
/// Records written before the scheme tag existed carry a hex SHA-256 of
/// `salt || password`, so a missing tag deserializes as [`PasswordScheme::Sha256`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    #[default]
    Sha256,
    Argon2id,
}

/// Salted password material for a protected file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPassword {
    pub scheme: PasswordScheme,
    pub hash: String,
    pub salt: String,
}

/// Persisted metadata for one uploaded file.
///
/// Field names on the wire match the JSON document the store reads and
/// writes, so existing `database.json` files load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    pub original_name: String,
    #[serde(rename = "filename")]
    pub storage_filename: String,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(rename = "upload_date")]
    pub uploaded_at: DateTime<Utc>,
    /// `None` means the file never expires
    #[serde(rename = "expiry_date", default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub password_salt: Option<String>,
    #[serde(default)]
    pub password_scheme: PasswordScheme,
    #[serde(default)]
    pub downloads: u64,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Password material, if the record is protected.
    ///
    /// A hash alone marks the record protected; a missing salt verifies as
    /// the empty salt.
    pub fn stored_password(&self) -> Option<StoredPassword> {
        let hash = self.password_hash.as_ref()?;
        Some(StoredPassword {
            scheme: self.password_scheme,
            hash: hash.clone(),
            salt: self.password_salt.clone().unwrap_or_default(),
        })
    }

    pub fn set_password(&mut self, password: StoredPassword) {
        self.password_scheme = password.scheme;
        self.password_hash = Some(password.hash);
        self.password_salt = Some(password.salt);
    }

    /// Expired records have a non-null expiry at or before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    /// Check the structural invariants every persisted record must hold.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("record id must not be empty".to_string());
        }
        if self.storage_filename.is_empty() {
            return Err(format!("record {} has no storage filename", self.id));
        }
        if self.password_hash.is_some() != self.password_salt.is_some() {
            return Err(format!(
                "record {} must carry both password hash and salt or neither",
                self.id
            ));
        }
        if let Some(expiry) = self.expires_at {
            if expiry <= self.uploaded_at {
                return Err(format!(
                    "record {} expires at {} which is not after its upload at {}",
                    self.id, expiry, self.uploaded_at
                ));
            }
        }
        if matches!(self.short_id.as_deref(), Some("")) {
            return Err(format!("record {} has an empty short id", self.id));
        }
        Ok(())
    }
}

/// A blob the caller has already written to the blob store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub storage_filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl StoredBlob {
    /// File id derived from the storage filename (its stem).
    pub fn file_id(&self) -> String {
        Path::new(&self.storage_filename)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.storage_filename.clone())
    }
}

/// Public view of a newly created file. Never carries password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mimetype: String,
    pub url: String,
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub has_password: bool,
}

/// Read-only projection returned by info lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(flatten)]
    pub file: FileDescriptor,
    pub upload_date: DateTime<Utc>,
    pub downloads: u64,
}

/// Request-side facts a download carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadContext {
    /// Password passed as a query parameter
    pub query_password: Option<String>,
    /// Password passed in the `x-download-password` header
    pub header_password: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

impl DownloadContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.query_password = Some(password.into());
        self
    }

    pub fn with_header_password(mut self, password: impl Into<String>) -> Self {
        self.header_password = Some(password.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// The password to check: the query value when non-blank, else the header.
    /// Returns `None` when neither carries a non-blank value.
    pub fn candidate_password(&self) -> Option<&str> {
        [&self.query_password, &self.header_password]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .find(|p| !p.trim().is_empty())
    }
}

/// Where to stream a download from. Byte transfer is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub path: PathBuf,
    pub download_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record() -> FileRecord {
        let uploaded = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        FileRecord {
            id: "a1B2c3D4e5".into(),
            short_id: None,
            original_name: "report.pdf".into(),
            storage_filename: "a1B2c3D4e5.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 2048,
            uploaded_at: uploaded,
            expires_at: Some(uploaded + Duration::hours(24)),
            password_hash: None,
            password_salt: None,
            password_scheme: PasswordScheme::default(),
            downloads: 0,
            created_at: uploaded,
        }
    }

    #[test]
    fn legacy_document_without_scheme_loads_as_sha256() {
        let json = r#"{
            "id": "V1StGXR8_Z",
            "original_name": "photo.jpg",
            "filename": "V1StGXR8_Z.jpg",
            "mimetype": "image/jpeg",
            "size": 1234,
            "upload_date": "2024-01-01T10:00:00.000Z",
            "expiry_date": null,
            "password_hash": "abc",
            "password_salt": "def",
            "downloads": 3,
            "created_at": "2024-01-01T10:00:00.000Z"
        }"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.password_scheme, PasswordScheme::Sha256);
        assert_eq!(record.storage_filename, "V1StGXR8_Z.jpg");
        assert_eq!(record.downloads, 3);
        assert!(record.expires_at.is_none());
        assert!(record.short_id.is_none());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let r = record();
        let expiry = r.expires_at.unwrap();
        assert!(!r.is_expired(expiry - Duration::seconds(1)));
        assert!(r.is_expired(expiry));
    }

    #[test]
    fn validate_rejects_half_password() {
        let mut r = record();
        r.password_hash = Some("hash".into());
        assert!(r.validate().is_err());
        r.password_salt = Some("salt".into());
        assert!(r.validate().is_ok());
    }

    #[test]
    fn hash_without_salt_is_still_protected() {
        let mut r = record();
        r.password_hash = Some("abcd".into());
        assert!(r.has_password());
        let stored = r.stored_password().unwrap();
        assert_eq!(stored.hash, "abcd");
        assert_eq!(stored.salt, "");
    }

    #[test]
    fn validate_rejects_expiry_not_after_upload() {
        let mut r = record();
        r.expires_at = Some(r.uploaded_at);
        assert!(r.validate().is_err());
    }

    #[test]
    fn file_id_is_filename_stem() {
        let blob = StoredBlob {
            storage_filename: "Xy12ab34Cd.tar.gz".into(),
            original_name: "backup.tar.gz".into(),
            mime_type: "application/gzip".into(),
            size_bytes: 10,
        };
        assert_eq!(blob.file_id(), "Xy12ab34Cd.tar");

        let bare = StoredBlob {
            storage_filename: "noextension".into(),
            ..blob
        };
        assert_eq!(bare.file_id(), "noextension");
    }

    #[test]
    fn query_password_wins_unless_blank() {
        let ctx = DownloadContext::new()
            .with_password("from-query")
            .with_header_password("from-header");
        assert_eq!(ctx.candidate_password(), Some("from-query"));

        let ctx = DownloadContext::new()
            .with_password("   ")
            .with_header_password("from-header");
        assert_eq!(ctx.candidate_password(), Some("from-header"));

        let ctx = DownloadContext::new().with_header_password("");
        assert_eq!(ctx.candidate_password(), None);
    }

    #[test]
    fn descriptor_serializes_without_secrets() {
        let descriptor = FileDescriptor {
            id: "a1B2c3D4e5".into(),
            name: "report.pdf".into(),
            size: 2048,
            mimetype: "application/pdf".into(),
            url: "http://localhost:3001/f/a1B2c3D4e5".into(),
            download_url: "http://localhost:3001/api/download/a1B2c3D4e5".into(),
            short_url: None,
            expiry_date: None,
            has_password: true,
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["hasPassword"], true);
        assert_eq!(json["downloadUrl"], "http://localhost:3001/api/download/a1B2c3D4e5");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("shortUrl").is_none());
    }
}
