//! Reading the scanner's JSON report

use serde::Deserialize;
use serde_json::Value;

use wpaudit_core::error::AuditError;
use wpaudit_core::types::ScanFinding;

use crate::ScanResult;

/// Top-level shape of a semgrep `--json` report; only `results` matters here
#[derive(Debug, Deserialize)]
struct ScanOutput {
    results: Option<Vec<Value>>,
}

/// Parse a report body into findings, in report order
pub fn parse_scan_output(slug: &str, body: &str) -> ScanResult<Vec<ScanFinding>> {
    let output: ScanOutput = serde_json::from_str(body).map_err(|e| AuditError::ScanOutput {
        slug: slug.to_string(),
        reason: format!("invalid JSON: {}", e),
    })?;

    let results = output.results.ok_or_else(|| AuditError::ScanOutput {
        slug: slug.to_string(),
        reason: "report has no 'results' array".to_string(),
    })?;

    Ok(results.into_iter().map(ScanFinding::from_value).collect())
}
