//! # wpaudit-core
//!
//! Core types and utilities shared across all wpaudit crates.
//!
//! This crate provides:
//! - `PackageDescriptor` and `ScanFinding`, the records flowing through the pipeline
//! - `AuditError` enum for unified error handling
//! - Path utilities used when unpacking untrusted archives
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (PackageDescriptor, ScanFinding)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{AuditError, AuditResult};
pub use types::{PackageDescriptor, ScanFinding};
