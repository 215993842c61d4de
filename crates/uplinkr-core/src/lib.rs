//! Uplinkr Core Library
//!
//! This crate provides the domain models, error types, configuration and expiry
//! policy shared by every Uplinkr component.

pub mod config;
pub mod error;
pub mod expiry;
pub mod hooks;
pub mod models;

// Re-export commonly used types
pub use config::{ClamAVConfig, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use expiry::ExpiryOption;
pub use hooks::{LifecycleEvents, NoOpLifecycleEvents, TracingLifecycleEvents};
