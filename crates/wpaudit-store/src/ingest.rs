//! Result Ingestor
//!
//! The single write path from the pipeline into the store. Every insert is
//! its own unit of work and is committed before the call returns.

use tracing::debug;

use wpaudit_core::types::{PackageDescriptor, ScanFinding};

use crate::{AuditStore, StoreResult};

/// Commit-per-record writer over a borrowed store
pub struct ResultIngestor<'a, S: AuditStore> {
    store: &'a mut S,
    plugins_inserted: u64,
    findings_inserted: u64,
}

impl<'a, S: AuditStore> ResultIngestor<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            plugins_inserted: 0,
            findings_inserted: 0,
        }
    }

    /// Persist one registry descriptor
    pub fn insert_plugin(&mut self, descriptor: &PackageDescriptor) -> StoreResult<()> {
        self.store.insert_plugin(descriptor)?;
        self.store.commit()?;
        self.plugins_inserted += 1;
        debug!(slug = %descriptor.slug, "Inserted data for plugin {}", descriptor.slug);
        Ok(())
    }

    /// Persist one finding, tagged with the slug of the package it came from
    pub fn insert_finding(&mut self, slug: &str, finding: &ScanFinding) -> StoreResult<()> {
        self.store.insert_finding(slug, finding)?;
        self.store.commit()?;
        self.findings_inserted += 1;
        Ok(())
    }

    /// Drop every stored finding (`--clear-results`)
    pub fn delete_all_findings(&mut self) -> StoreResult<()> {
        self.store.delete_all_findings()?;
        self.store.commit()
    }

    pub fn plugins_inserted(&self) -> u64 {
        self.plugins_inserted
    }

    pub fn findings_inserted(&self) -> u64 {
        self.findings_inserted
    }
}
