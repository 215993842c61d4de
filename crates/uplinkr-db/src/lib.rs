//! Uplinkr metadata store
//!
//! [`FileStore`] is the single-writer contract every metadata backend honours:
//! reads may run concurrently, mutations are serialized, and a mutation is
//! visible only once it is durable. [`JsonFileStore`] keeps the whole store in
//! memory and rewrites one JSON document on every mutation.

pub mod error;
pub mod json;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use json::{JsonFileStore, DEFAULT_ANALYTICS_CAPACITY};
pub use traits::FileStore;
