//! Configuration layering, fallback logic, and environment overrides

use std::collections::HashMap;
use camino::{Utf8Path, Utf8PathBuf};
use wpaudit_core::error::AuditError;
use crate::{ConfigResult, file::{self, AuditConfig}};

/// Project configuration file name
pub const CONFIG_FILE_NAME: &str = "wpaudit.toml";

/// Environment variables honoured on top of the config file
const ENV_DOWNLOAD_DIR: &str = "WPAUDIT_DOWNLOAD_DIR";
const ENV_DB_PATH: &str = "WPAUDIT_DB_PATH";
const ENV_SCANNER_RULES: &str = "WPAUDIT_SCANNER_RULES";
const ENV_REGISTRY_URL: &str = "WPAUDIT_REGISTRY_URL";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Home directory, for the per-user config
    home: Option<Utf8PathBuf>,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Where the file layer of the configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Path given with `--config-file`
    Explicit(Utf8PathBuf),
    /// `wpaudit.toml` in the working directory
    Project(Utf8PathBuf),
    /// `~/.wpaudit/config.toml`
    Global(Utf8PathBuf),
    /// No file found, built-in defaults
    Defaults,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        let home = dirs::home_dir().and_then(|home| Utf8PathBuf::try_from(home).ok());
        Self { cwd, home }
    }

    /// Override the home directory used for the per-user config
    pub fn with_home(mut self, home: Option<Utf8PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Path of the per-user configuration file
    pub fn global_config_path(&self) -> Option<Utf8PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(".wpaudit").join("config.toml"))
    }

    /// Decide which file, if any, supplies the file layer.
    ///
    /// An explicit path must exist; the implicit locations are optional.
    pub fn resolve_config_path(&self, explicit: Option<&Utf8Path>) -> ConfigResult<ConfigSource> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.cwd.join(path)
            };
            if !path.is_file() {
                return Err(AuditError::ConfigValidation {
                    field: "config_file".to_string(),
                    reason: format!("{} does not exist", path),
                });
            }
            return Ok(ConfigSource::Explicit(path));
        }

        let project = self.cwd.join(CONFIG_FILE_NAME);
        if project.is_file() {
            return Ok(ConfigSource::Project(project));
        }

        if let Some(global) = self.global_config_path() {
            if global.is_file() {
                return Ok(ConfigSource::Global(global));
            }
        }

        Ok(ConfigSource::Defaults)
    }

    /// Load the file layer with fallbacks
    pub async fn load(&self, explicit: Option<&Utf8Path>) -> ConfigResult<(AuditConfig, ConfigSource)> {
        let source = self.resolve_config_path(explicit)?;

        let config = match &source {
            ConfigSource::Explicit(path) | ConfigSource::Project(path) | ConfigSource::Global(path) => {
                file::load_from_file(path).await?
            }
            ConfigSource::Defaults => AuditConfig::default(),
        };

        Ok((config, source))
    }
}

impl ConfigLayering {
    /// Apply environment and CLI overrides to the file layer, then validate
    pub fn merge_configs(
        file_config: AuditConfig,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<AuditConfig> {
        let mut merged = file_config;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut merged, env_overrides)?;

        // Apply CLI flag overrides (highest priority)
        Self::apply_cli_overrides(&mut merged, cli_overrides)?;

        file::validate_config(&merged)?;
        Ok(merged)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: &mut AuditConfig, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                ENV_DOWNLOAD_DIR => {
                    config.download_dir = Utf8PathBuf::from(value);
                }
                ENV_DB_PATH => {
                    config.store.path = Utf8PathBuf::from(value);
                }
                ENV_SCANNER_RULES => {
                    config.scanner.rules = value.clone();
                }
                ENV_REGISTRY_URL => {
                    file::validate_registry_url(value)?;
                    config.registry.base_url = value.clone();
                }
                _ => {
                    // Unknown environment variable, ignore
                }
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(config: &mut AuditConfig, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "download_dir" => {
                    config.download_dir = Utf8PathBuf::from(value);
                }
                "db" => {
                    config.store.path = Utf8PathBuf::from(value);
                }
                "rules" => {
                    config.scanner.rules = value.clone();
                }
                "page_size" => {
                    config.registry.page_size = value.parse()
                        .map_err(|e| AuditError::ConfigValidation {
                            field: "page_size".to_string(),
                            reason: format!("Invalid number in --page-size flag: {}", e),
                        })?;
                }
                _ => {
                    // Unknown CLI override, ignore
                }
            }
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("WPAUDIT_"))
            .collect()
    }
}
