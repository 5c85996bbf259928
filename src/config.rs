//! Layered configuration
//!
//! Sources, lowest precedence first: built-in defaults, a YAML file
//! (`service-desk.yaml` in the working directory, or an explicit path), and
//! environment variables such as `SERVICE_DESK__STORAGE__BACKEND=sqlite`.

use crate::error::{Result, ServiceDeskError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base name of the optional configuration file in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "service-desk";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "SERVICE_DESK";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub notifications: NotificationConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl DeskConfig {
    /// Load configuration; an explicit `path` must exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let loaded: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<()> {
        if self.storage.lock_timeout_ms == 0 {
            return Err(ServiceDeskError::validation(
                "storage.lock_timeout_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Which backend the CLI and server use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// YAML document for the file backend; defaults to the user data dir
    pub path: Option<PathBuf>,
    pub database_url: String,
    /// Lock / connection acquisition timeout
    pub lock_timeout_ms: u64,
    /// Age after which a leftover lock file is reclaimed
    pub stale_lock_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: None,
            database_url: "sqlite://service-desk.db".to_string(),
            lock_timeout_ms: 5_000,
            stale_lock_secs: 30,
        }
    }
}

impl StorageConfig {
    /// Path of the YAML document, falling back to the platform data dir
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        ProjectDirs::from("", "", "service-desk")
            .map(|dirs| dirs.data_dir().join("desk.yaml"))
            .ok_or_else(|| {
                ServiceDeskError::validation(
                    "could not determine a data directory; set storage.path",
                )
            })
    }
}

/// Baseline used when computing resolution time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionClock {
    /// Always measure from ticket creation, reopens included
    #[default]
    FromCreation,
    /// Measure from the most recent reopen when there was one
    FromLastReopen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Re-plan attempts after a concurrent ticket modification
    pub max_conflict_retries: u32,
    pub resolution_clock: ResolutionClock,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            resolution_clock: ResolutionClock::FromCreation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing-subscriber` env-filter directive
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
