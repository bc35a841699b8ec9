//! Core data types for the wpaudit pipeline.
//!
//! This module provides the records that flow between pipeline stages:
//! - Package descriptors as returned by the registry listing
//! - Findings as emitted by the external static-analysis scanner

pub mod descriptor;
pub mod finding;

// Re-export all public types
pub use descriptor::PackageDescriptor;
pub use finding::ScanFinding;
