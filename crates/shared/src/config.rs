//! Configuration management for ranking-dl.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Ranking fetcher settings
    pub fetcher: FetcherConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Ranking fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Ranking endpoint URL
    pub base_url: String,

    /// User-agent header sent with every request
    pub user_agent: String,

    /// Records requested per page
    pub per_page: u32,

    /// Per-attempt request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum attempts per page before it is skipped
    pub max_retries: u32,

    /// Base delay between retry attempts in milliseconds
    pub retry_base_delay_ms: u64,

    /// Cap on a single retry delay in milliseconds (worker-pool mode)
    pub retry_max_delay_ms: u64,

    /// Inter-page pacing settings
    pub pacing: PacingConfig,

    /// Run mode selection
    pub mode: RunMode,

    /// Number of part files in partitioned mode
    pub parts: u32,

    /// Worker count in concurrent mode
    pub workers: usize,

    /// Sort concurrent-mode output by page number before writing
    pub sort_output: bool,
}

/// Inter-page pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Starting delay between page requests in milliseconds
    pub base_delay_ms: u64,

    /// Lower bound the delay relaxes toward in milliseconds
    pub min_delay_ms: u64,

    /// Upper bound the delay backs off toward in milliseconds
    pub max_delay_ms: u64,
}

/// How the page range is traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One page at a time, adaptively paced
    Sequential,
    /// Contiguous chunks written to separate part files
    Partitioned,
    /// Fixed-width worker pool, output in completion order
    Concurrent,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            fetcher: FetcherConfig {
                base_url: "https://m.jbzd.com.pl/ranking/get".to_string(),
                user_agent: "Mozilla/5.0".to_string(),
                per_page: 50,
                request_timeout_secs: 30,
                max_retries: 5,
                retry_base_delay_ms: 2000,
                retry_max_delay_ms: 60_000,
                pacing: PacingConfig {
                    base_delay_ms: 1000,
                    min_delay_ms: 250,
                    max_delay_ms: 60_000,
                },
                mode: RunMode::Sequential,
                parts: 10,
                workers: 4,
                sort_output: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Load configuration from a TOML file or fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::from_file(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Check that the fetcher settings describe a runnable configuration
    pub fn validate(&self) -> Result<()> {
        let f = &self.fetcher;

        if f.per_page == 0 {
            bail!("fetcher.per_page must be at least 1");
        }
        if f.max_retries == 0 {
            bail!("fetcher.max_retries must be at least 1");
        }
        if f.pacing.min_delay_ms > f.pacing.base_delay_ms
            || f.pacing.base_delay_ms > f.pacing.max_delay_ms
        {
            bail!(
                "fetcher.pacing delays must be ordered: min ({}) <= base ({}) <= max ({})",
                f.pacing.min_delay_ms,
                f.pacing.base_delay_ms,
                f.pacing.max_delay_ms
            );
        }
        if f.parts == 0 {
            bail!("fetcher.parts must be at least 1");
        }
        if f.workers == 0 {
            bail!("fetcher.workers must be at least 1");
        }

        Ok(())
    }

    /// Get the absolute path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.data_dir().join(log_path)
        }
    }
}
