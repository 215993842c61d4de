//! Data models for the file lifecycle service
//!
//! Persisted shapes ([`FileRecord`], [`AnalyticsEntry`]) keep the field names
//! of the on-disk JSON document; public projections never carry password
//! material.

mod analytics;
mod file;
mod stats;

pub use analytics::*;
pub use file::*;
pub use stats::*;
