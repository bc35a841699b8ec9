//! Scanner finding types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One issue reported by the external scanner.
///
/// The scanner's result object is kept verbatim in `raw`; the typed fields are
/// projections of the common semgrep shape and are `None` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFinding {
    pub check_id: Option<String>,
    pub path: Option<String>,
    pub start_line: Option<u64>,
    pub end_line: Option<u64>,
    pub message: Option<String>,
    pub severity: Option<String>,
    pub raw: Value,
}

impl ScanFinding {
    /// Build a finding from one entry of the scanner's `results` array
    pub fn from_value(raw: Value) -> Self {
        let str_at = |pointer: &str| raw.pointer(pointer).and_then(Value::as_str).map(str::to_string);
        let line_at = |pointer: &str| raw.pointer(pointer).and_then(Value::as_u64);

        Self {
            check_id: str_at("/check_id"),
            path: str_at("/path"),
            start_line: line_at("/start/line"),
            end_line: line_at("/end/line"),
            message: str_at("/extra/message"),
            severity: str_at("/extra/severity"),
            raw,
        }
    }
}
