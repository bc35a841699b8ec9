//! Download pipeline.
//!
//! Walks the registry listing page by page. Every descriptor is stored, then
//! eligible ones are downloaded and unpacked under `<download_dir>/plugins`.

use tracing::{debug, error, info};
use wpaudit_archive::{Acquisition, ArchiveAcquirer};
use wpaudit_config::AuditConfig;
use wpaudit_core::error::{AuditError, AuditResult};
use wpaudit_core::types::PackageDescriptor;
use wpaudit_registry::{PagePager, RegistryClient};
use wpaudit_store::{AuditStore, ResultIngestor};

use super::eligibility_filter;

/// Counters for one download pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Listing pages fetched
    pub pages: u32,
    /// Descriptors seen across all pages
    pub descriptors: u64,
    /// Descriptors that passed both eligibility gates
    pub eligible: u64,
    /// Archives downloaded and unpacked in this run
    pub extracted: u64,
    /// Eligible plugins already on disk
    pub already_present: u64,
    /// Eligible plugins without a download link
    pub skipped: u64,
    /// Downloads or extractions that failed
    pub failed: u64,
}

/// Fetch the listing, store every descriptor and acquire the eligible ones.
///
/// Per-plugin failures are logged and counted; only failing to prepare the
/// plugins directory aborts the pass.
pub async fn run_download<S: AuditStore>(
    client: &RegistryClient,
    config: &AuditConfig,
    ingestor: &mut ResultIngestor<'_, S>,
) -> AuditResult<DownloadSummary> {
    info!("Download plugins.");

    let acquirer = ArchiveAcquirer::new(client, config.download_dir.as_std_path())?;
    let filter = eligibility_filter(&config.eligibility);

    let mut pager = PagePager::new(client, config.registry.page_size)
        .with_browse(config.registry.browse.clone());
    let mut summary = DownloadSummary::default();

    while let Some(page) = pager.next_page().await {
        summary.pages += 1;
        debug!(page = page.number, total_pages = page.total_pages, "Page {}/{}.", page.number, page.total_pages);

        for descriptor in &page.plugins {
            summary.descriptors += 1;

            if let Err(e) = ingestor.insert_plugin(descriptor) {
                error!(slug = %descriptor.slug, error = %e, "Failed to store plugin {}", descriptor.slug);
            }

            let verdict = filter.check_now(descriptor);
            if !verdict.is_eligible() {
                debug!(slug = %descriptor.slug, verdict = ?verdict, "not downloading");
                continue;
            }
            summary.eligible += 1;

            match acquirer.acquire(descriptor).await {
                Ok(Acquisition::Extracted { .. }) => summary.extracted += 1,
                Ok(Acquisition::AlreadyPresent { .. }) => summary.already_present += 1,
                Ok(Acquisition::Skipped) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    log_acquire_failure(descriptor, &e);
                }
            }
        }
    }

    info!(
        pages = summary.pages,
        descriptors = summary.descriptors,
        eligible = summary.eligible,
        extracted = summary.extracted,
        failed = summary.failed,
        "download pass finished"
    );
    Ok(summary)
}

fn log_acquire_failure(descriptor: &PackageDescriptor, err: &AuditError) {
    let slug = descriptor.slug.as_str();
    match err {
        AuditError::Network { .. } | AuditError::RetriesExhausted { .. } | AuditError::HttpStatus { .. } => {
            error!(slug, "Failed to download {}: {}", slug, err);
        }
        // already reads "Failed to unzip <slug>: ..."
        AuditError::Archive { .. } => error!(slug, "{}", err),
        _ => error!(slug, "Failed to unzip {}: {}", slug, err),
    }
}
