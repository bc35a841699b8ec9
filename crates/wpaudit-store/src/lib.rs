//! Persistence boundary for wpaudit
//!
//! The pipeline only ever talks to the [`AuditStore`] trait. Every record goes
//! through a [`ResultIngestor`], which commits after each insert so that a
//! crash loses at most the record being written.

pub mod sqlite;
pub mod memory;
pub mod ingest;

pub use sqlite::SqliteStore;
pub use memory::{MemoryStore, StoreOp};
pub use ingest::ResultIngestor;

use wpaudit_core::error::AuditError;
use wpaudit_core::types::{PackageDescriptor, ScanFinding};

/// Result type for store operations
pub type StoreResult<T> = Result<T, AuditError>;

/// Operations the pipeline needs from persistent storage
pub trait AuditStore {
    /// Record one registry descriptor
    fn insert_plugin(&mut self, descriptor: &PackageDescriptor) -> StoreResult<()>;

    /// Record one scanner finding for `slug`
    fn insert_finding(&mut self, slug: &str, finding: &ScanFinding) -> StoreResult<()>;

    /// Remove every stored finding
    fn delete_all_findings(&mut self) -> StoreResult<()>;

    /// Make everything written since the last commit durable
    fn commit(&mut self) -> StoreResult<()>;

    /// Release the underlying connection
    fn close(self) -> StoreResult<()>
    where
        Self: Sized;
}
