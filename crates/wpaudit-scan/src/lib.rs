//! Scanner orchestration for wpaudit
//!
//! Runs an external static-analysis tool (semgrep by default) over every
//! unpacked plugin under `<root>/plugins` and hands its findings to the
//! result ingestor one at a time.

pub mod orchestrator;
pub mod output;

pub use orchestrator::{ScanOrchestrator, ScanReport, ScanSummary, ScannerConfig};
pub use output::parse_scan_output;

use wpaudit_core::error::AuditError;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, AuditError>;
