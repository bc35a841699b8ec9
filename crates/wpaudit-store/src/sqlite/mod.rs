//! SQLite-backed store
//!
//! Two tables: `plugins` holds every descriptor the registry listed,
//! `results` holds every scanner finding tagged with its plugin slug. The raw
//! JSON of both is kept alongside the projected columns.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use wpaudit_core::error::AuditError;
use wpaudit_core::types::{PackageDescriptor, ScanFinding};

use crate::{AuditStore, StoreResult};

const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS plugins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL,
    name TEXT,
    version TEXT,
    download_link TEXT,
    last_updated TEXT,
    active_installs INTEGER,
    raw TEXT NOT NULL,
    inserted_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_plugins_slug ON plugins (slug);

CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL,
    check_id TEXT,
    path TEXT,
    start_line INTEGER,
    end_line INTEGER,
    message TEXT,
    severity TEXT,
    raw TEXT NOT NULL,
    inserted_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_results_slug ON results (slug);
"#;

const REQUIRED_TABLES: [&str; 2] = ["plugins", "results"];

/// Store backed by a single SQLite connection
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the database at `path`.
    ///
    /// With `create_schema` the tables are created when missing. Without it
    /// they must already exist.
    pub fn connect(path: &Path, create_schema: bool) -> StoreResult<Self> {
        if create_schema {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AuditError::io(format!("Failed to create {}", parent.display()), e))?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| AuditError::store(format!("Failed to open database {}", path.display()), e))?;
        let store = Self { conn };

        if create_schema {
            store.create_schema()?;
            info!(path = %path.display(), "database schema ready");
        } else {
            store.check_schema()?;
        }

        debug!(path = %path.display(), "connected to store");
        Ok(store)
    }

    /// Private in-memory database with the schema in place
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AuditError::store("Failed to open in-memory database".to_string(), e))?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    /// Number of stored plugin rows
    pub fn plugin_count(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM plugins", None)
    }

    /// Number of stored findings, optionally restricted to one slug
    pub fn finding_count(&self, slug: Option<&str>) -> StoreResult<u64> {
        match slug {
            Some(slug) => self.count("SELECT COUNT(*) FROM results WHERE slug = ?1", Some(slug)),
            None => self.count("SELECT COUNT(*) FROM results", None),
        }
    }

    /// Check ids of the stored findings for `slug`, in insertion order
    pub fn finding_check_ids(&self, slug: &str) -> StoreResult<Vec<Option<String>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT check_id FROM results WHERE slug = ?1 ORDER BY id")
            .map_err(|e| AuditError::store("Failed to query findings".to_string(), e))?;
        let rows = stmt
            .query_map(params![slug], |row| row.get::<_, Option<String>>(0))
            .map_err(|e| AuditError::store("Failed to query findings".to_string(), e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AuditError::store("Failed to read findings".to_string(), e))
    }

    fn create_schema(&self) -> StoreResult<()> {
        self.conn
            .execute_batch(CREATE_SCHEMA)
            .map_err(|e| AuditError::store("Failed to create schema".to_string(), e))
    }

    fn check_schema(&self) -> StoreResult<()> {
        for table in REQUIRED_TABLES {
            let found = self
                .conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    params![table],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(|e| AuditError::store("Failed to inspect schema".to_string(), e))?;

            if found.is_none() {
                return Err(AuditError::Store {
                    message: format!("table '{}' does not exist", table),
                    source: None,
                });
            }
        }
        Ok(())
    }

    fn count(&self, sql: &str, slug: Option<&str>) -> StoreResult<u64> {
        let result = match slug {
            Some(slug) => self.conn.query_row(sql, params![slug], |row| row.get::<_, i64>(0)),
            None => self.conn.query_row(sql, [], |row| row.get::<_, i64>(0)),
        };
        result
            .map(|n| n.max(0) as u64)
            .map_err(|e| AuditError::store("Failed to count rows".to_string(), e))
    }

    fn begin_if_needed(&self) -> StoreResult<()> {
        if self.conn.is_autocommit() {
            self.conn
                .execute_batch("BEGIN")
                .map_err(|e| AuditError::store("Failed to begin transaction".to_string(), e))?;
        }
        Ok(())
    }
}

impl AuditStore for SqliteStore {
    fn insert_plugin(&mut self, descriptor: &PackageDescriptor) -> StoreResult<()> {
        self.begin_if_needed()?;
        self.conn
            .execute(
                "INSERT INTO plugins (slug, name, version, download_link, last_updated, active_installs, raw, inserted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    descriptor.slug,
                    descriptor.name,
                    descriptor.version,
                    descriptor.download_link,
                    descriptor.last_updated,
                    descriptor.active_installs().and_then(|n| i64::try_from(n).ok()),
                    descriptor.to_json(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| AuditError::store(format!("Failed to insert plugin {}", descriptor.slug), e))?;
        Ok(())
    }

    fn insert_finding(&mut self, slug: &str, finding: &ScanFinding) -> StoreResult<()> {
        let line = |n: Option<u64>| n.and_then(|n| i64::try_from(n).ok());

        self.begin_if_needed()?;
        self.conn
            .execute(
                "INSERT INTO results (slug, check_id, path, start_line, end_line, message, severity, raw, inserted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    slug,
                    finding.check_id,
                    finding.path,
                    line(finding.start_line),
                    line(finding.end_line),
                    finding.message,
                    finding.severity,
                    finding.raw.to_string(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| AuditError::store(format!("Failed to insert finding for {}", slug), e))?;
        Ok(())
    }

    fn delete_all_findings(&mut self) -> StoreResult<()> {
        self.begin_if_needed()?;
        let removed = self
            .conn
            .execute("DELETE FROM results", [])
            .map_err(|e| AuditError::store("Failed to clear results".to_string(), e))?;
        debug!(removed, "cleared stored findings");
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT")
                .map_err(|e| AuditError::store("Failed to commit".to_string(), e))?;
        }
        Ok(())
    }

    fn close(self) -> StoreResult<()> {
        self.conn
            .close()
            .map_err(|(_, e)| AuditError::store("Failed to close database".to_string(), e))
    }
}

#[cfg(test)]
mod tests;
