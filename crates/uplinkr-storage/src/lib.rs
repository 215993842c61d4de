//! Uplinkr Storage Library
//!
//! Blob storage for uploaded files. Blobs live flat under a single upload
//! directory and are addressed by their storage filename: ten random
//! alphanumerics followed by the original extension (`Xy12ab34Cd.pdf`). The
//! filename stem doubles as the public file id.
//!
//! Storage filenames must not contain path separators, `..` or a leading dot.

pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use keys::{generate_storage_filename, STORAGE_ID_LENGTH};
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
