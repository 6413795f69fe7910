//! Error types for sheetsync-core

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type surfaced to the sync driver.
///
/// Only enumeration failures, overlap rejection and configuration problems
/// reach callers. Per-tab fetch failures and malformed cells are absorbed
/// and logged where they happen.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote source could not be reached or enumerated
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Another sync is still in flight
    #[error("A sync is already running")]
    AlreadyRunning,

    /// Snapshot persistence failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Records could not be exported
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Remote spreadsheet source errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Source has no spreadsheet id or credentials
    #[error("Source not configured: {0}")]
    NotConfigured(String),

    /// Transport-level failure
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Non-success HTTP status
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Rate limited by the remote
    #[error("Rate limited")]
    RateLimited,

    /// Response body had an unexpected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Tab does not exist
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
}

/// Snapshot persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Envelope written by an unknown format version
    #[error("Unsupported snapshot version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(String),

    /// Config file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Value is out of its valid range
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Required field is missing
    #[error("Missing field: {0}")]
    MissingField(String),
}

/// Record export errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// CSV writer failure
    #[error("CSV error: {0}")]
    Csv(String),

    /// JSON serialization failure
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Json(err.to_string())
    }
}

#[cfg(feature = "google")]
impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::RequestFailed(err.to_string())
        }
    }
}
