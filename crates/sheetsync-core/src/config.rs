//! Configuration for sheetsync
//!
//! Centralized configuration for the remote source, sync timing, snapshot
//! storage, the HTTP shell, and the classifier's keyword tables.
//!
//! ```toml
//! [source]
//! spreadsheet_id = "1AbC..."
//! column_span = "A:Z"
//!
//! [sync]
//! interval_minutes = 5
//! exclude_marker = "wip"
//!
//! [classifier]
//! partner_keywords = ["vendor", "partner", "manufacturer"]
//! max_distinct = 50
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// System-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSyncConfig {
    /// Remote spreadsheet settings
    pub source: SourceConfig,
    /// Sync timing and tab selection
    pub sync: SyncSettings,
    /// Snapshot persistence
    pub storage: StorageConfig,
    /// HTTP shell
    pub server: ServerConfig,
    /// Field-role and status keyword tables
    pub classifier: ClassifierConfig,
}

/// Remote spreadsheet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Spreadsheet document id
    pub spreadsheet_id: String,
    /// API root, without trailing slash
    pub api_base: String,
    /// Env var holding an OAuth bearer token
    pub access_token_env: String,
    /// Env var holding an API key (used when no token is set)
    pub api_key_env: String,
    /// Column span fetched from every tab
    pub column_span: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            api_base: "https://sheets.googleapis.com".to_string(),
            access_token_env: "GOOGLE_ACCESS_TOKEN".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            column_span: "A:Z".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Sync timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Periodic sync interval in minutes
    pub interval_minutes: u64,
    /// Tabs whose name contains this (case-insensitive) are skipped
    pub exclude_marker: String,
    /// Sync attempts kept by the monitor
    pub history_size: usize,
    /// Run one sync before serving
    pub sync_on_startup: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            exclude_marker: "wip".to_string(),
            history_size: 100,
            sync_on_startup: true,
        }
    }
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub snapshot_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("data/storage-data.json"),
        }
    }
}

/// HTTP shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3001".to_string(),
        }
    }
}

/// Ordered keyword tables driving field-role detection and status health.
///
/// All keywords are matched lower-case. Role keywords match as substrings
/// of field names; status keywords match whole words of the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub partner_keywords: Vec<String>,
    pub product_keywords: Vec<String>,
    pub status_keywords: Vec<String>,
    /// Checked first
    pub ready_keywords: Vec<String>,
    /// Checked second
    pub blocked_keywords: Vec<String>,
    /// Checked last
    pub in_progress_keywords: Vec<String>,
    /// A filter field needs strictly more distinct values than this
    pub min_distinct: usize,
    /// ...and at most this many
    pub max_distinct: usize,
    /// Field-name keywords of a certification-style boolean column
    pub certification_keywords: Vec<String>,
    /// Values counted as certified
    pub affirmative_values: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            partner_keywords: words(&["vendor", "partner", "manufacturer", "company", "provider"]),
            product_keywords: words(&["product", "model", "solution", "platform", "offering"]),
            status_keywords: words(&["status", "state", "support", "condition", "phase"]),
            ready_keywords: words(&[
                "active",
                "supported",
                "available",
                "pass",
                "passed",
                "success",
                "successful",
                "approved",
                "stable",
                "yes",
                "ga",
                "certified",
                "complete",
                "completed",
            ]),
            blocked_keywords: words(&[
                "not supported",
                "unsupported",
                "not available",
                "unavailable",
                "fail",
                "failed",
                "failure",
                "error",
                "rejected",
                "deprecated",
                "end-of-life",
                "end of life",
                "eol",
                "blocked",
                "no",
            ]),
            in_progress_keywords: words(&[
                "pending",
                "partial",
                "beta",
                "alpha",
                "preview",
                "tech preview",
                "experimental",
                "in progress",
                "planned",
                "testing",
            ]),
            min_distinct: 1,
            max_distinct: 50,
            certification_keywords: words(&["certif"]),
            affirmative_values: words(&["yes", "y", "true", "certified", "x", "✓", "✔"]),
        }
    }
}

impl SheetSyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a TOML or JSON file, chosen by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    /// Apply `GOOGLE_SHEET_ID`, `SYNC_INTERVAL_MINUTES`, `SNAPSHOT_PATH`
    /// and `PORT` from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("GOOGLE_SHEET_ID") {
            self.source.spreadsheet_id = id;
        }
        if let Some(minutes) = lookup("SYNC_INTERVAL_MINUTES") {
            self.sync.interval_minutes = minutes.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(format!("SYNC_INTERVAL_MINUTES={}", minutes))
            })?;
        }
        if let Some(path) = lookup("SNAPSHOT_PATH") {
            self.storage.snapshot_path = PathBuf::from(path);
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("PORT={}", port)))?;
            let host = self
                .server
                .addr
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.server.addr = format!("{}:{}", host, port);
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.interval_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "interval_minutes must be positive".to_string(),
            ));
        }

        if self.sync.exclude_marker.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "exclude_marker must not be empty".to_string(),
            ));
        }

        if self.source.column_span.trim().is_empty() {
            return Err(ConfigError::MissingField("column_span".to_string()));
        }

        let classifier = &self.classifier;
        if classifier.max_distinct <= classifier.min_distinct {
            return Err(ConfigError::InvalidValue(
                "max_distinct must be greater than min_distinct".to_string(),
            ));
        }

        if classifier.ready_keywords.is_empty()
            || classifier.blocked_keywords.is_empty()
            || classifier.in_progress_keywords.is_empty()
        {
            return Err(ConfigError::MissingField(
                "status keyword tables must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
