//! Configuration module for FileDock.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for FileDock.
///
/// Sections missing from the YAML file take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub poll: PollConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:3000`.
    pub listen: String,
    /// Path the file API is mounted on.
    pub base_path: String,
    /// Largest accepted upload request body (in MiB).
    pub max_upload_mb: u64,
}

/// Storage directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Flat directory holding uploaded files. Created on first use.
    pub root: PathBuf,
}

/// Long-poll settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// How long a poll request is held open without a change (milliseconds).
    pub timeout_ms: u64,
}

/// Prometheus endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Path the metrics are served on.
    pub path: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/filedock/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("filedock")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3000".to_string(),
            base_path: "/files".to_string(),
            max_upload_mb: 100,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"poll.timeout_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- server ---
        if self.server.listen.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError {
                field: "server.listen".into(),
                message: format!("not a socket address: '{}'", self.server.listen),
            });
        }
        if let Some(message) = check_mount_path(&self.server.base_path) {
            errors.push(ValidationError {
                field: "server.base_path".into(),
                message,
            });
        }
        if self.server.max_upload_mb == 0 {
            errors.push(ValidationError {
                field: "server.max_upload_mb".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- storage ---
        if self.storage.root.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.root".into(),
                message: "must not be empty".into(),
            });
        }

        // --- poll ---
        if self.poll.timeout_ms == 0 {
            errors.push(ValidationError {
                field: "poll.timeout_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- metrics ---
        if self.metrics.enabled {
            if let Some(message) = check_mount_path(&self.metrics.path) {
                errors.push(ValidationError {
                    field: "metrics.path".into(),
                    message,
                });
            } else if self.metrics.path == self.server.base_path {
                errors.push(ValidationError {
                    field: "metrics.path".into(),
                    message: format!("collides with server.base_path '{}'", self.server.base_path),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }

    /// Upload body limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.server.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

fn check_mount_path(path: &str) -> Option<String> {
    if !path.starts_with('/') {
        Some(format!("must start with '/': '{path}'"))
    } else if path.len() > 1 && path.ends_with('/') {
        Some(format!("must not end with '/': '{path}'"))
    } else if path == "/" {
        Some("must not be the server root".into())
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use filedock_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .storage_root(PathBuf::from("/srv/filedock"))
///     .poll_timeout_ms(10_000)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration, e.g. one loaded from disk.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // -- server --

    pub fn server_listen(mut self, listen: impl Into<String>) -> Self {
        self.config.server.listen = listen.into();
        self
    }

    pub fn server_base_path(mut self, path: impl Into<String>) -> Self {
        self.config.server.base_path = path.into();
        self
    }

    pub fn server_max_upload_mb(mut self, mb: u64) -> Self {
        self.config.server.max_upload_mb = mb;
        self
    }

    // -- storage --

    pub fn storage_root(mut self, root: PathBuf) -> Self {
        self.config.storage.root = root;
        self
    }

    // -- poll --

    pub fn poll_timeout_ms(mut self, ms: u64) -> Self {
        self.config.poll.timeout_ms = ms;
        self
    }

    // -- metrics --

    pub fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.config.metrics.enabled = enabled;
        self
    }

    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.config.metrics.path = path.into();
        self
    }

    // -- logging --

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the [`Config`] without validation.
    pub fn build(self) -> Config {
        self.config
    }

    /// Consume the builder, validate, and return the [`Config`] or the list
    /// of validation errors.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
