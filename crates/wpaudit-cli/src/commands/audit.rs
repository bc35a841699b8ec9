//! Audit pipeline: run the scanner over everything under `<download_dir>/plugins`.

use wpaudit_config::{AuditConfig, ScannerSection};
use wpaudit_scan::{ScanOrchestrator, ScanSummary, ScannerConfig};
use wpaudit_store::{AuditStore, ResultIngestor};

pub async fn run_audit<S: AuditStore>(config: &AuditConfig, ingestor: &mut ResultIngestor<'_, S>) -> ScanSummary {
    ScanOrchestrator::new(scanner_config(&config.scanner))
        .scan_all(config.download_dir.as_std_path(), ingestor)
        .await
}

pub fn scanner_config(section: &ScannerSection) -> ScannerConfig {
    ScannerConfig {
        program: section.program.clone(),
        rules: section.rules.clone(),
        output_file: section.output_file.clone(),
        extra_args: section.extra_args.clone(),
    }
}
