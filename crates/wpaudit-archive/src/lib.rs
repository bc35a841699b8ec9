//! Plugin archive acquisition for wpaudit
//!
//! This crate downloads plugin zip archives and unpacks them under
//! `<root>/plugins/<slug>`. Extraction happens in a staging directory and the
//! finished package directory is moved into place in one rename, carrying a
//! completion marker, so an interrupted run never leaves a half-extracted
//! package that later runs would mistake for a complete one.

pub mod zipfile;
pub mod acquire;

// Re-export main types
pub use zipfile::{extract_zip, ExtractStats};
pub use acquire::{
    is_complete, read_marker, Acquisition, ArchiveAcquirer, CompletionMarker, MARKER_FILE,
    PLUGINS_DIR, STAGING_DIR,
};

use wpaudit_core::error::AuditError;

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, AuditError>;
