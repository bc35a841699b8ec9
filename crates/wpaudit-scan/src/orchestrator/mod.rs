//! Scan Orchestrator
//!
//! Packages are scanned strictly one after another. For each package the
//! scanner writes its report into the package directory; the report is only
//! read when the scanner exited successfully, so a failed run can never feed
//! a stale report into the store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error, info, warn};

use wpaudit_archive::{is_complete, PLUGINS_DIR};
use wpaudit_core::error::AuditError;
use wpaudit_core::types::ScanFinding;
use wpaudit_core::utils::is_hidden;
use wpaudit_store::{AuditStore, ResultIngestor};

use crate::output::parse_scan_output;
use crate::ScanResult;

/// Bytes of scanner stderr kept for the failure log
const STDERR_TAIL: usize = 2048;

/// How to invoke the external scanner
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Executable name or path
    pub program: String,
    /// Rule-config identifier passed to `--config` (e.g. `p/php`)
    pub rules: String,
    /// Report file name, created inside each package directory
    pub output_file: String,
    /// Extra arguments placed before the target directory
    pub extra_args: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            program: "semgrep".to_string(),
            rules: "p/php".to_string(),
            output_file: "scan_output.json".to_string(),
            extra_args: vec!["--quiet".to_string()],
        }
    }
}

/// Findings produced by one successful scanner run
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub slug: String,
    pub findings: Vec<ScanFinding>,
}

/// Totals for a whole audit pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Packages whose report was read
    pub scanned: usize,
    /// Packages skipped because the scanner or its report failed
    pub failed: usize,
    /// Findings handed to the store
    pub findings: u64,
}

/// Drives the external scanner over unpacked packages
pub struct ScanOrchestrator {
    config: ScannerConfig,
}

impl ScanOrchestrator {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Scan every package under `<root>/plugins` and ingest the findings.
    ///
    /// A package that fails is logged and skipped; nothing here stops the pass.
    pub async fn scan_all<S: AuditStore>(&self, root: &Path, ingestor: &mut ResultIngestor<'_, S>) -> ScanSummary {
        info!("Run scanner and store results.");

        let mut summary = ScanSummary::default();
        let packages = match package_dirs(&root.join(PLUGINS_DIR)) {
            Ok(packages) => packages,
            Err(e) => {
                error!(error = %e, "Failed to list plugin directories");
                return summary;
            }
        };

        for dir in packages {
            let slug = slug_of(&dir);

            let report = match self.scan_package(&dir).await {
                Ok(report) => report,
                Err(e) => {
                    error!(slug = %slug, "{}", e);
                    summary.failed += 1;
                    continue;
                }
            };

            summary.scanned += 1;
            for finding in &report.findings {
                match ingestor.insert_finding(&report.slug, finding) {
                    Ok(()) => summary.findings += 1,
                    Err(e) => error!(slug = %report.slug, error = %e, "Failed to store finding"),
                }
            }
        }

        info!(
            scanned = summary.scanned,
            failed = summary.failed,
            findings = summary.findings,
            "scan pass finished"
        );
        summary
    }

    /// Run the scanner on one package directory and read its report
    pub async fn scan_package(&self, dir: &Path) -> ScanResult<ScanReport> {
        let slug = slug_of(dir);
        let output_path = dir.join(&self.config.output_file);

        if !is_complete(dir) {
            warn!(slug = %slug, "Scanning {} without a completion marker", dir.display());
        }

        match fs::remove_file(&output_path) {
            Ok(()) => debug!(slug = %slug, "removed stale report"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AuditError::io(
                    format!("Failed to remove stale report {}", output_path.display()),
                    e,
                ))
            }
        }

        let output = Command::new(&self.config.program)
            .arg("--config")
            .arg(&self.config.rules)
            .arg("--json")
            .arg("--no-git-ignore")
            .arg("--output")
            .arg(&output_path)
            .args(&self.config.extra_args)
            .arg(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AuditError::Scanner {
                slug: slug.clone(),
                reason: format!("could not start '{}': {}", self.config.program, e),
            })?;

        if !output.status.success() {
            return Err(AuditError::Scanner {
                slug,
                reason: format!("{}: {}", output.status, stderr_tail(&output.stderr)),
            });
        }
        debug!(slug = %slug, "Scanner analysis completed for {}.", slug);

        let body = fs::read_to_string(&output_path).map_err(|e| AuditError::ScanOutput {
            slug: slug.clone(),
            reason: format!("{}: {}", output_path.display(), e),
        })?;

        let findings = parse_scan_output(&slug, &body)?;
        debug!(slug = %slug, findings = findings.len(), "report parsed");

        Ok(ScanReport { slug, findings })
    }
}

/// Visible subdirectories of `plugins_dir`, sorted by name
fn package_dirs(plugins_dir: &Path) -> ScanResult<Vec<PathBuf>> {
    if !plugins_dir.is_dir() {
        warn!(path = %plugins_dir.display(), "No plugins directory, nothing to scan");
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(plugins_dir)
        .map_err(|e| AuditError::io(format!("Failed to read {}", plugins_dir.display()), e))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| AuditError::io(format!("Failed to read {}", plugins_dir.display()), e))?;
        let path = entry.path();
        if path.is_dir() && !is_hidden(&path) {
            dirs.push(path);
        }
    }

    dirs.sort();
    Ok(dirs)
}

fn slug_of(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        return "no output on stderr".to_string();
    }

    let mut start = text.len().saturating_sub(STDERR_TAIL);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
