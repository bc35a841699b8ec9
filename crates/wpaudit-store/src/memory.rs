//! In-memory store that records every call
//!
//! Useful wherever a pipeline stage needs a store but persistence is beside
//! the point: the recorded operations can be inspected afterwards.

use wpaudit_core::types::{PackageDescriptor, ScanFinding};

use crate::{AuditStore, StoreResult};

/// One call made against a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Plugin(String),
    Finding { slug: String, check_id: Option<String> },
    DeleteFindings,
    Commit,
}

/// Store keeping descriptors and findings in vectors
#[derive(Debug, Default)]
pub struct MemoryStore {
    ops: Vec<StoreOp>,
    plugins: Vec<PackageDescriptor>,
    findings: Vec<(String, ScanFinding)>,
    uncommitted: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call in the order it was made
    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    pub fn plugins(&self) -> &[PackageDescriptor] {
        &self.plugins
    }

    pub fn findings(&self) -> &[(String, ScanFinding)] {
        &self.findings
    }

    /// Writes made since the last commit
    pub fn uncommitted(&self) -> usize {
        self.uncommitted
    }
}

impl AuditStore for MemoryStore {
    fn insert_plugin(&mut self, descriptor: &PackageDescriptor) -> StoreResult<()> {
        self.ops.push(StoreOp::Plugin(descriptor.slug.clone()));
        self.plugins.push(descriptor.clone());
        self.uncommitted += 1;
        Ok(())
    }

    fn insert_finding(&mut self, slug: &str, finding: &ScanFinding) -> StoreResult<()> {
        self.ops.push(StoreOp::Finding {
            slug: slug.to_string(),
            check_id: finding.check_id.clone(),
        });
        self.findings.push((slug.to_string(), finding.clone()));
        self.uncommitted += 1;
        Ok(())
    }

    fn delete_all_findings(&mut self) -> StoreResult<()> {
        self.ops.push(StoreOp::DeleteFindings);
        self.findings.clear();
        self.uncommitted += 1;
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.ops.push(StoreOp::Commit);
        self.uncommitted = 0;
        Ok(())
    }

    fn close(self) -> StoreResult<()> {
        Ok(())
    }
}
