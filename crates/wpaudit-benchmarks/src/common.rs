//! Common utilities for benchmarks

use criterion::Criterion;
use serde_json::json;
use std::io::{Cursor, Write};
use wpaudit_core::types::PackageDescriptor;
use zip::write::SimpleFileOptions;

/// Shorter runs than criterion's defaults; the inputs are small
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(2))
        .measurement_time(std::time::Duration::from_secs(5))
        .sample_size(50)
}

/// Descriptors with a mix of fresh, stale, popular and malformed entries
pub fn sample_descriptors(count: usize) -> Vec<PackageDescriptor> {
    (0..count)
        .map(|i| {
            let mut descriptor = PackageDescriptor::new(format!("plugin-{}", i));
            descriptor.last_updated = Some(match i % 4 {
                0 => "2024-06-01 10:00am GMT".to_string(),
                1 => "2016-02-11 3:45pm GMT".to_string(),
                2 => "2023-12-31 11:59pm UTC".to_string(),
                _ => "not a date".to_string(),
            });
            descriptor.active_installs = Some(match i % 3 {
                0 => json!(i * 100),
                1 => json!(format!("{}", i * 10)),
                _ => json!(null),
            });
            descriptor
        })
        .collect()
}

/// A plugin archive with `files` PHP sources of `file_size` bytes each
pub fn plugin_zip(slug: &str, files: usize, file_size: usize) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let body = "<?php // x\n".repeat(file_size / 11 + 1);

    // writes into an in-memory buffer cannot fail
    let _ = writer.add_directory(format!("{}/", slug), options);
    for i in 0..files {
        let _ = writer.start_file(format!("{}/includes/file-{}.php", slug, i), options);
        let _ = writer.write_all(&body.as_bytes()[..file_size]);
    }
    writer
        .finish()
        .map(|cursor| cursor.into_inner())
        .unwrap_or_default()
}

/// A scanner report with `count` findings
pub fn scan_report(count: usize) -> String {
    let results: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "check_id": "php.lang.security.injection.tainted-sql-string",
                "path": format!("plugin/includes/file-{}.php", i),
                "start": { "line": i + 1, "col": 5 },
                "end": { "line": i + 2, "col": 20 },
                "extra": { "message": "User input flows into a SQL query", "severity": "ERROR" }
            })
        })
        .collect();
    json!({ "results": results, "errors": [] }).to_string()
}
