//! Configuration parsing for wpaudit
//!
//! This crate handles parsing and validation of `wpaudit.toml` and layers
//! environment variables and command-line flags on top of it, producing the
//! single `AuditConfig` a run is driven by.

pub mod file;
pub mod merge;

// Re-export main types
pub use file::{
    AuditConfig, EligibilitySection, RegistrySection, RetrySection, ScannerSection, StoreSection,
    DEFAULT_REGISTRY_URL,
};
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, CONFIG_FILE_NAME};

use wpaudit_core::error::AuditError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, AuditError>;
