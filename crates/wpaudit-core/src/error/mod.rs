//! Error types and result aliases for wpaudit operations.
//!
//! Provides a unified error type that covers all failure conditions across the
//! acquisition-and-audit pipeline with actionable error messages.

use thiserror::Error;

/// Unified error type for all wpaudit operations
#[derive(Error, Debug)]
pub enum AuditError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Giving up on '{url}' after {attempts} attempts")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("HTTP status {status} for '{url}'")]
    HttpStatus { url: String, status: u16 },

    // Registry data errors
    #[error("Malformed registry response for page {page}: {reason}")]
    MalformedResponse { page: u32, reason: String },

    // Archive errors
    #[error("Failed to unzip {slug}: {reason}")]
    Archive { slug: String, reason: String },

    #[error("Archive for {slug} has no top-level '{slug}/' directory")]
    ArchiveLayout { slug: String },

    #[error("Refusing to extract unsafe path: {path}")]
    UnsafePath { path: String },

    // Scanner errors
    #[error("Scanner failed for {slug}: {reason}")]
    Scanner { slug: String, reason: String },

    #[error("Failed to read scan output for {slug}: {reason}")]
    ScanOutput { slug: String, reason: String },

    // Store errors
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Config errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for wpaudit operations
pub type AuditResult<T> = Result<T, AuditError>;

impl AuditError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create a store error from any error type
    pub fn store<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            AuditError::Network { .. } | AuditError::RetriesExhausted { .. } => {
                Some("Check your internet connection and try again")
            },
            AuditError::Store { .. } => {
                Some("Run with --create-schema if the database has not been initialised yet")
            },
            AuditError::Scanner { .. } => {
                Some("Make sure the scanner is installed and on PATH (e.g. `pip install semgrep`)")
            },
            AuditError::ConfigParse { .. } | AuditError::ConfigValidation { .. } => {
                Some("Check wpaudit.toml or the command-line flags")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AuditError::MalformedResponse {
            page: 3,
            reason: "missing 'plugins' array".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed registry response for page 3: missing 'plugins' array");

        let err = AuditError::HttpStatus {
            url: "http://x/foo.zip".to_string(),
            status: 404,
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("http://x/foo.zip"));

        let err = AuditError::ArchiveLayout { slug: "bar".to_string() };
        assert!(err.to_string().contains("'bar/'"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = AuditError::io("Failed to open output".to_string(), io_err);
        assert!(err.source().is_some());
        assert!(err.suggestion().is_none());
    }
}
