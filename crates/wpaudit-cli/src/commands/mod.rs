//! Run orchestration.
//!
//! Turns the parsed command line into a layered configuration, opens the store
//! for the duration of the run, and drives the download and audit pipelines
//! in that order.

use camino::Utf8PathBuf;
use clap::CommandFactory;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use wpaudit_config::{AuditConfig, ConfigLayering, ConfigLoader, EligibilitySection, RetrySection};
use wpaudit_core::error::{AuditError, AuditResult};
use wpaudit_registry::{EligibilityFilter, RegistryClient, RetryConfig};
use wpaudit_scan::ScanSummary;
use wpaudit_store::{AuditStore, ResultIngestor, SqliteStore};

pub mod audit;
pub mod download;


use crate::{output::OutputHandler, Cli};
use download::DownloadSummary;

/// Shared context for a run
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Create a new command context
    pub fn new() -> AuditResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| AuditError::io("Failed to get current directory".to_string(), e))?;

        let output = OutputHandler::new();

        Ok(Self { cwd, output })
    }
}

/// What a run should do, independent of configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mode {
    pub download: bool,
    pub audit: bool,
    pub create_schema: bool,
    pub clear_results: bool,
}

impl Mode {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            download: cli.download,
            audit: cli.audit,
            create_schema: cli.create_schema,
            clear_results: cli.clear_results,
        }
    }

    /// At least one pipeline was requested
    pub fn is_selected(&self) -> bool {
        self.download || self.audit
    }
}

/// Totals reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub download: Option<DownloadSummary>,
    pub audit: Option<ScanSummary>,
    pub plugins_inserted: u64,
    pub findings_inserted: u64,
}

/// Entry point for a parsed command line
pub async fn execute(cli: &Cli, ctx: &CommandContext) -> AuditResult<()> {
    let mode = Mode::from_cli(cli);

    if !mode.is_selected() {
        error!("Please set either the --download or --audit option.");
        return show_help();
    }

    info!("Started audit.");
    let config = load_config(cli, ctx).await?;

    let mut store = SqliteStore::connect(config.store.path.as_std_path(), mode.create_schema)?;
    let result = run_pipeline(&config, mode, &mut store).await;
    let closed = store.close();

    let summary = result?;
    closed?;

    print_summary(&summary, ctx);
    Ok(())
}

/// Run the selected pipelines against an already opened store
pub async fn run_pipeline<S: AuditStore>(config: &AuditConfig, mode: Mode, store: &mut S) -> AuditResult<RunSummary> {
    let mut ingestor = ResultIngestor::new(store);

    if mode.clear_results {
        ingestor.delete_all_findings()?;
        info!("Cleared stored findings.");
    }

    let download = if mode.download {
        let client = build_client(config)?;
        Some(download::run_download(&client, config, &mut ingestor).await?)
    } else {
        None
    };

    let audit = if mode.audit {
        Some(audit::run_audit(config, &mut ingestor).await)
    } else {
        None
    };

    Ok(RunSummary {
        download,
        audit,
        plugins_inserted: ingestor.plugins_inserted(),
        findings_inserted: ingestor.findings_inserted(),
    })
}

/// Layer config file, environment and command-line flags
pub async fn load_config(cli: &Cli, ctx: &CommandContext) -> AuditResult<AuditConfig> {
    let cwd = Utf8PathBuf::from_path_buf(ctx.cwd.clone()).map_err(|path| AuditError::ConfigValidation {
        field: "cwd".to_string(),
        reason: format!("working directory {} is not valid UTF-8", path.display()),
    })?;

    let explicit = cli
        .config_file
        .as_ref()
        .map(|path| utf8_path("config_file", path))
        .transpose()?;

    let loader = ConfigLoader::new(cwd);
    let (file_config, source) = loader.load(explicit.as_deref()).await?;
    info!(source = ?source, "configuration loaded");

    let env_overrides = ConfigLayering::collect_env_overrides();
    let cli_overrides = cli_overrides(cli)?;

    ConfigLayering::merge_configs(file_config, &env_overrides, &cli_overrides)
}

fn cli_overrides(cli: &Cli) -> AuditResult<HashMap<String, String>> {
    let mut overrides = HashMap::new();

    if let Some(dir) = &cli.download_dir {
        overrides.insert("download_dir".to_string(), utf8_path("download_dir", dir)?.into_string());
    }
    if let Some(db) = &cli.db {
        overrides.insert("db".to_string(), utf8_path("db", db)?.into_string());
    }
    if let Some(rules) = &cli.rules {
        overrides.insert("rules".to_string(), rules.clone());
    }
    if let Some(page_size) = cli.page_size {
        overrides.insert("page_size".to_string(), page_size.to_string());
    }

    Ok(overrides)
}

fn utf8_path(field: &str, path: &std::path::Path) -> AuditResult<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|path| AuditError::ConfigValidation {
        field: field.to_string(),
        reason: format!("{} is not valid UTF-8", path.display()),
    })
}

/// Shared HTTP client for the run
pub fn build_client(config: &AuditConfig) -> AuditResult<RegistryClient> {
    RegistryClient::with_config(
        config.registry.base_url.clone(),
        retry_config(&config.retry),
        Duration::from_secs(config.registry.timeout_secs),
        &config.registry.user_agent,
    )
}

pub fn retry_config(section: &RetrySection) -> RetryConfig {
    RetryConfig {
        max_retries: section.max_retries,
        initial_delay: Duration::from_millis(section.initial_delay_ms),
        max_delay: Duration::from_millis(section.max_delay_ms),
        multiplier: section.multiplier,
    }
}

pub fn eligibility_filter(section: &EligibilitySection) -> EligibilityFilter {
    EligibilityFilter {
        min_active_installs: section.min_active_installs,
        max_age_years: section.max_age_years,
    }
}

/// Print the usage text (no pipeline selected)
pub fn show_help() -> AuditResult<()> {
    Cli::command()
        .print_help()
        .map_err(|e| AuditError::io("Failed to print help".to_string(), e))
}

fn print_summary(summary: &RunSummary, ctx: &CommandContext) {
    if let Some(download) = &summary.download {
        ctx.output.success(&format!(
            "Download: {} pages, {} plugins listed, {} eligible, {} extracted, {} already present",
            download.pages, download.descriptors, download.eligible, download.extracted, download.already_present
        ));
        if download.failed > 0 || download.skipped > 0 {
            ctx.output.warn(&format!(
                "{} plugins failed to download or unpack, {} had no archive",
                download.failed, download.skipped
            ));
        }
    }

    if let Some(audit) = &summary.audit {
        ctx.output.success(&format!(
            "Audit: {} plugins scanned, {} findings stored",
            audit.scanned, audit.findings
        ));
        if audit.failed > 0 {
            ctx.output.warn(&format!("{} plugins could not be scanned", audit.failed));
        }
    }

    ctx.output.info(&format!(
        "Stored {} plugin records and {} findings",
        summary.plugins_inserted, summary.findings_inserted
    ));
}
