//! Runner configuration
//!
//! Loaded from TOML. A missing file is created with defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Order runner configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Store settings
    pub store: StoreSettings,
    /// Logging settings
    pub logging: LoggingSettings,
    /// Seed settings
    pub seed: SeedSettings,
    /// Report settings
    pub report: ReportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Database name
    pub database: String,
    /// Orders collection name
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level
    pub level: LogLevel,
    /// Log format
    pub format: LogFormat,
    /// Slow query threshold in milliseconds
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSettings {
    /// JSON seed file (None for the built-in sample orders)
    pub file: Option<PathBuf>,
    /// Empty the collection before seeding
    pub reset_on_start: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Status looked up and then deleted
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: "SalesDB".to_string(),
            collection: "orderinfo".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            slow_query_threshold_ms: 100,
        }
    }
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            file: None,
            reset_on_start: true,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            status: "A".to_string(),
        }
    }
}

/// Reads, validates and writes [`RunnerConfig`] files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the config at `path`, writing defaults there first if it does not exist
    pub fn load_or_init(path: &Path) -> Result<RunnerConfig> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = RunnerConfig::default();
            Self::save(path, &config)?;
            info!("Wrote default configuration to {}", path.display());
            Ok(config)
        }
    }

    pub fn load(path: &Path) -> Result<RunnerConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: RunnerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Self::validate(&config)?;

        Ok(config)
    }

    pub fn save(path: &Path, config: &RunnerConfig) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(config).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn validate(config: &RunnerConfig) -> Result<()> {
        if config.store.database.trim().is_empty() {
            return Err(anyhow::anyhow!("Database name cannot be empty"));
        }

        if config.store.collection.trim().is_empty() {
            return Err(anyhow::anyhow!("Collection name cannot be empty"));
        }

        if config.report.status.is_empty() {
            return Err(anyhow::anyhow!("Report status cannot be empty"));
        }

        Ok(())
    }
}
