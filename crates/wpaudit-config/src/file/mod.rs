//! wpaudit.toml configuration parsing and serialization

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use wpaudit_core::error::AuditError;
use crate::ConfigResult;

/// Plugin information endpoint of the public registry
pub const DEFAULT_REGISTRY_URL: &str = "https://api.wordpress.org/plugins/info/1.2/";

/// Largest page the registry will serve
const MAX_PAGE_SIZE: u32 = 250;

/// Complete wpaudit.toml configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Root under which `plugins/` is created and scanned
    pub download_dir: Utf8PathBuf,

    /// Registry listing
    pub registry: RegistrySection,

    /// Transient network failure handling
    pub retry: RetrySection,

    /// Download gates
    pub eligibility: EligibilitySection,

    /// External scanner invocation
    pub scanner: ScannerSection,

    /// Relational store
    pub store: StoreSection,
}

/// Registry listing section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySection {
    /// Plugin information endpoint
    pub base_url: String,

    /// Plugins requested per page
    pub page_size: u32,

    /// Optional listing filter (`popular`, `new`, `updated`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browse: Option<String>,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// User-Agent header
    pub user_agent: String,
}

/// Retry section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

/// Eligibility section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EligibilitySection {
    pub min_active_installs: u64,
    pub max_age_years: i32,
}

/// Scanner section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScannerSection {
    /// Executable name or path
    pub program: String,

    /// Rule-config identifier
    pub rules: String,

    /// Report file written inside each package directory
    pub output_file: String,

    /// Extra arguments passed before the target directory
    pub extra_args: Vec<String>,
}

/// Store section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// SQLite database file
    pub path: Utf8PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            download_dir: Utf8PathBuf::from("."),
            registry: RegistrySection::default(),
            retry: RetrySection::default(),
            eligibility: EligibilitySection::default(),
            scanner: ScannerSection::default(),
            store: StoreSection::default(),
        }
    }
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY_URL.to_string(),
            page_size: 10,
            browse: None,
            timeout_secs: 30,
            user_agent: concat!("wpaudit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 5_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
        }
    }
}

impl Default for EligibilitySection {
    fn default() -> Self {
        Self {
            min_active_installs: 1000,
            max_age_years: 2,
        }
    }
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            program: "semgrep".to_string(),
            rules: "p/php".to_string(),
            output_file: "scan_output.json".to_string(),
            extra_args: vec!["--quiet".to_string()],
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from("wpaudit.db"),
        }
    }
}

/// Parse TOML string to AuditConfig
pub fn parse_config(content: &str) -> ConfigResult<AuditConfig> {
    let config: AuditConfig = toml::from_str(content)
        .map_err(|e| AuditError::ConfigParse {
            message: format!("TOML parsing error: {}", e),
        })?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize AuditConfig to TOML string
pub fn serialize_config(config: &AuditConfig) -> ConfigResult<String> {
    toml::to_string_pretty(config)
        .map_err(|e| AuditError::ConfigParse {
            message: format!("TOML serialization error: {}", e),
        })
}

/// Validate configuration values
pub fn validate_config(config: &AuditConfig) -> ConfigResult<()> {
    validate_registry_url(&config.registry.base_url)?;

    if config.registry.page_size == 0 || config.registry.page_size > MAX_PAGE_SIZE {
        return Err(invalid(
            "registry.page_size",
            format!("must be between 1 and {}, got {}", MAX_PAGE_SIZE, config.registry.page_size),
        ));
    }

    if config.registry.timeout_secs == 0 {
        return Err(invalid("registry.timeout_secs", "must be positive".to_string()));
    }

    if !config.retry.multiplier.is_finite() || config.retry.multiplier < 1.0 {
        return Err(invalid(
            "retry.multiplier",
            format!("must be at least 1.0, got {}", config.retry.multiplier),
        ));
    }

    if config.retry.initial_delay_ms > config.retry.max_delay_ms {
        return Err(invalid(
            "retry.initial_delay_ms",
            "must not exceed retry.max_delay_ms".to_string(),
        ));
    }

    if config.eligibility.max_age_years < 0 {
        return Err(invalid("eligibility.max_age_years", "must not be negative".to_string()));
    }

    if config.scanner.program.trim().is_empty() {
        return Err(invalid("scanner.program", "must not be empty".to_string()));
    }

    if config.scanner.rules.trim().is_empty() {
        return Err(invalid("scanner.rules", "must not be empty".to_string()));
    }

    // The report lives inside the package directory it describes
    let output = Utf8Path::new(&config.scanner.output_file);
    if output.file_name() != Some(config.scanner.output_file.as_str()) {
        return Err(invalid(
            "scanner.output_file",
            format!("must be a plain file name, got '{}'", config.scanner.output_file),
        ));
    }

    if config.store.path.as_str().is_empty() {
        return Err(invalid("store.path", "must not be empty".to_string()));
    }

    Ok(())
}

/// Load and parse wpaudit.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<AuditConfig> {
    let content = tokio::fs::read_to_string(path).await
        .map_err(|e| AuditError::io(format!("Failed to read {}", path), e))?;

    parse_config(&content)
        .map_err(|e| match e {
            AuditError::ConfigParse { message } => AuditError::ConfigParse {
                message: format!("In file {}: {}", path, message),
            },
            AuditError::ConfigValidation { field, reason } => AuditError::ConfigValidation {
                field,
                reason: format!("{} (in {})", reason, path),
            },
            other => other,
        })
}

/// The registry endpoint must be an absolute http(s) URL
pub(crate) fn validate_registry_url(value: &str) -> ConfigResult<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| invalid("registry.base_url", format!("'{}' is not a valid URL: {}", value, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(
            "registry.base_url",
            format!("unsupported scheme '{}', expected http or https", other),
        )),
    }
}

fn invalid(field: &str, reason: String) -> AuditError {
    AuditError::ConfigValidation {
        field: field.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, AuditConfig::default());
        assert_eq!(config.registry.base_url, DEFAULT_REGISTRY_URL);
        assert_eq!(config.registry.page_size, 10);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.eligibility.min_active_installs, 1000);
        assert_eq!(config.scanner.rules, "p/php");
        assert_eq!(config.store.path, "wpaudit.db");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
download_dir = "/srv/wpaudit"

[registry]
page_size = 100
browse = "popular"

[retry]
max_retries = 2
initial_delay_ms = 100

[eligibility]
min_active_installs = 10000
max_age_years = 1

[scanner]
program = "/opt/semgrep/bin/semgrep"
rules = "p/owasp-top-ten"
extra_args = ["--quiet", "--timeout", "60"]

[store]
path = "/var/lib/wpaudit/audit.db"
"#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.download_dir, "/srv/wpaudit");
        assert_eq!(config.registry.page_size, 100);
        assert_eq!(config.registry.browse.as_deref(), Some("popular"));
        // unset fields keep their defaults
        assert_eq!(config.registry.timeout_secs, 30);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.max_delay_ms, 60_000);
        assert_eq!(config.eligibility.max_age_years, 1);
        assert_eq!(config.scanner.extra_args.len(), 3);
        assert_eq!(config.scanner.output_file, "scan_output.json");
        assert_eq!(config.store.path, "/var/lib/wpaudit/audit.db");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = parse_config("[registry]\npagesize = 5\n").unwrap_err();
        assert!(matches!(err, AuditError::ConfigParse { .. }));
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("[registry]\npage_size = 0\n", "registry.page_size"),
            ("[registry]\npage_size = 251\n", "registry.page_size"),
            ("[registry]\nbase_url = \"ftp://example.org/\"\n", "registry.base_url"),
            ("[registry]\nbase_url = \"not a url\"\n", "registry.base_url"),
            ("[retry]\nmultiplier = 0.5\n", "retry.multiplier"),
            ("[retry]\ninitial_delay_ms = 90000\n", "retry.initial_delay_ms"),
            ("[scanner]\nprogram = \"  \"\n", "scanner.program"),
            ("[scanner]\noutput_file = \"../out.json\"\n", "scanner.output_file"),
        ];

        for (toml, expected_field) in cases {
            match parse_config(toml) {
                Err(AuditError::ConfigValidation { field, .. }) => assert_eq!(field, expected_field, "{}", toml),
                other => panic!("expected validation error for {:?}, got {:?}", toml, other),
            }
        }
    }

    #[test]
    fn test_round_trip_serialization() {
        let mut config = AuditConfig::default();
        config.registry.browse = Some("updated".to_string());
        config.scanner.extra_args.push("--metrics=off".to_string());

        let serialized = serialize_config(&config).unwrap();
        let reparsed = parse_config(&serialized).unwrap();

        assert_eq!(config, reparsed);
    }

    #[tokio::test]
    async fn test_load_from_file_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("wpaudit.toml")).unwrap();
        tokio::fs::write(&path, "[registry]\npage_size = 0\n").await.unwrap();

        let err = load_from_file(&path).await.unwrap_err();
        assert!(err.to_string().contains("wpaudit.toml"));
    }

    proptest! {
        #[test]
        fn prop_page_size_validation(page_size in 0u32..1000) {
            let toml = format!("[registry]\npage_size = {}\n", page_size);
            let accepted = parse_config(&toml).is_ok();
            prop_assert_eq!(accepted, (1..=MAX_PAGE_SIZE).contains(&page_size));
        }
    }
}
