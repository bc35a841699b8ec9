//! # wpaudit
//!
//! Downloads WordPress plugins from the public registry and audits them with an
//! external static-analysis scanner.
//!
//! This is the main entry point for the wpaudit CLI tool. It handles argument
//! parsing, sets up logging and error handling, and hands the run to the
//! download and audit pipelines.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wpaudit_core::error::{AuditError, AuditResult};

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Crates whose log level follows `--verbose`
const LOG_TARGETS: [&str; 7] = [
    "wpaudit",
    "wpaudit_core",
    "wpaudit_config",
    "wpaudit_registry",
    "wpaudit_archive",
    "wpaudit_scan",
    "wpaudit_store",
];

/// Downloads or audits all WordPress plugins
#[derive(Parser, Debug)]
#[command(
    name = "wpaudit",
    version,
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (built ",
        env!("WPAUDIT_BUILD_DATE"),
        ", ",
        env!("WPAUDIT_RUSTC_VERSION"),
        ")"
    ),
    about = "Downloads or audits all WordPress plugins"
)]
pub struct Cli {
    /// Download and extract eligible plugins; existing plugin directories are left alone
    #[arg(long)]
    pub download: bool,

    /// Audit downloaded plugins sequentially
    #[arg(long)]
    pub audit: bool,

    /// Directory to save/audit downloaded plugins (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Scanner rule configuration to run (default: p/php)
    #[arg(long = "config", value_name = "RULES")]
    pub rules: Option<String>,

    /// Create the database schema if it does not exist yet
    #[arg(long)]
    pub create_schema: bool,

    /// Clear stored findings before running
    #[arg(long)]
    pub clear_results: bool,

    /// Print detailed messages
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (default: ./wpaudit.toml, then ~/.wpaudit/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// SQLite database file (default: wpaudit.db)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Plugins requested per registry page (default: 10)
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log line layout
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_format);
    setup_panic_handler();

    info!("Starting wpaudit v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "wpaudit run failed");
            eprintln!("{}", ErrorFormatter::new().format_error(&e));
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> AuditResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| AuditError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new()?;
        commands::execute(&cli, &ctx).await
    })
}

fn setup_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "info" };
    let directives = LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",");

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.with_target(false).init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("wpaudit encountered an unexpected error: {}", panic_info);
        eprintln!("wpaudit crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/wpaudit/wpaudit/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
