//! Password protection for shared files.
//!
//! New records are hashed with Argon2id and stored as a PHC string; the salt is
//! also stored on its own so that hash and salt are always present together.
//! Records from before the scheme tag existed hold a hex SHA-256 of
//! `salt || password` and stay verifiable.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uplinkr_core::models::{FileRecord, PasswordScheme, StoredPassword};
use uplinkr_core::AppError;

/// Result of checking a download request against a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    /// Protected record, no usable password presented
    PasswordRequired,
    /// Protected record, presented password does not match
    InvalidPassword,
}

/// Verifies presented passwords against stored salted hashes
pub struct AccessGuard;

impl AccessGuard {
    /// Hash a cleartext password for storage.
    pub fn hash_password(password: &str) -> Result<StoredPassword, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::System(format!("Failed to hash password: {}", e)))?;

        Ok(StoredPassword {
            scheme: PasswordScheme::Argon2id,
            hash,
            salt: salt.as_str().to_string(),
        })
    }

    /// Check `candidate` against stored password material.
    pub fn verify_password(candidate: &str, stored: &StoredPassword) -> Result<bool, AppError> {
        match stored.scheme {
            PasswordScheme::Argon2id => {
                let parsed_hash = PasswordHash::new(&stored.hash).map_err(|e| {
                    AppError::System(format!("Invalid stored password hash: {}", e))
                })?;
                Ok(Argon2::default()
                    .verify_password(candidate.as_bytes(), &parsed_hash)
                    .is_ok())
            }
            PasswordScheme::Sha256 => {
                let computed = legacy_digest(&stored.salt, candidate);
                let expected = stored.hash.to_ascii_lowercase();
                Ok(computed.as_bytes().ct_eq(expected.as_bytes()).into())
            }
        }
    }

    /// Decide whether a download of `record` may proceed with `candidate`.
    ///
    /// A blank candidate counts as no password at all.
    pub fn authorize(
        record: &FileRecord,
        candidate: Option<&str>,
    ) -> Result<AccessDecision, AppError> {
        let Some(stored) = record.stored_password() else {
            return Ok(AccessDecision::Granted);
        };

        let candidate = match candidate {
            Some(c) if !c.trim().is_empty() => c,
            _ => return Ok(AccessDecision::PasswordRequired),
        };

        if Self::verify_password(candidate, &stored)? {
            Ok(AccessDecision::Granted)
        } else {
            Ok(AccessDecision::InvalidPassword)
        }
    }
}

fn legacy_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
