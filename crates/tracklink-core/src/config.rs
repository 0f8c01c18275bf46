//! Configuration management for tracklink.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{JobConfig, Platform};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/tracklink/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Job defaults: pacing, retries, worker count
    pub search: SearchConfig,
    /// Platform resolver settings
    pub resolver: ResolverConfig,
    /// Live progress delivery settings
    pub progress: ProgressConfig,
    /// Job retention settings
    pub jobs: JobsConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    ///
    /// # Errors
    /// Returns error if the file is missing, unreadable, or not valid TOML.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply `TRACKLINK_*` environment overrides.
    ///
    /// Reads `TRACKLINK_DELAY_SECS`, `TRACKLINK_MAX_RETRIES`,
    /// `TRACKLINK_CONCURRENCY` and `TRACKLINK_PLATFORMS` (comma separated).
    /// Values that fail to parse are ignored.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("TRACKLINK_DELAY_SECS") {
            if let Ok(delay) = val.parse() {
                self.search.delay_secs = delay;
                tracing::debug!("Override search.delay_secs from env: {}", delay);
            }
        }

        if let Ok(val) = std::env::var("TRACKLINK_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.search.max_retries = retries;
                tracing::debug!("Override search.max_retries from env: {}", retries);
            }
        }

        if let Ok(val) = std::env::var("TRACKLINK_CONCURRENCY") {
            if let Ok(concurrency) = val.parse() {
                self.search.concurrency = concurrency;
                tracing::debug!("Override search.concurrency from env: {}", concurrency);
            }
        }

        if let Ok(val) = std::env::var("TRACKLINK_PLATFORMS") {
            let platforms: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if !platforms.is_empty() {
                tracing::debug!("Override resolver.platforms from env: {:?}", platforms);
                self.resolver.platforms = platforms;
            }
        }
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/tracklink/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "tracklink", "tracklink").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Job defaults applied when the caller does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Per-worker delay between resolver calls, in seconds
    pub delay_secs: f64,
    /// Total attempts per row
    pub max_retries: u32,
    /// Number of workers per job
    pub concurrency: usize,
    /// Backoff never exceeds `delay * backoff_cap_multiplier`
    pub backoff_cap_multiplier: u32,
    /// Upper bound of uniform random jitter added to backoff waits (0 = off)
    pub jitter_ms: u64,
}

impl SearchConfig {
    /// Validate the configured defaults into a [`JobConfig`].
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if any value is out of range.
    pub fn job_config(&self) -> ConfigResult<JobConfig> {
        if self.backoff_cap_multiplier == 0 {
            return Err(ConfigError::invalid(
                "backoff_cap_multiplier",
                "must be at least 1",
            ));
        }
        JobConfig::new(self.delay_secs, self.max_retries, self.concurrency)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            delay_secs: 1.5,
            max_retries: 3,
            concurrency: 2,
            backoff_cap_multiplier: 10,
            jitter_ms: 0,
        }
    }
}

/// Platform resolver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Platforms to try, in order
    pub platforms: Vec<String>,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Base URL for YouTube searches
    pub youtube_base_url: String,
    /// Base URL for 4shared searches
    pub fourshared_base_url: String,
    /// Maximum number of query variants tried per platform
    pub max_variants: usize,
}

impl ResolverConfig {
    /// Parse the configured platform list.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for an empty list or an unknown platform.
    pub fn platform_order(&self) -> ConfigResult<Vec<Platform>> {
        if self.platforms.is_empty() {
            return Err(ConfigError::invalid("platforms", "at least one platform is required"));
        }

        let mut order = Vec::with_capacity(self.platforms.len());
        for name in &self.platforms {
            let platform: Platform = name
                .parse()
                .map_err(|e: crate::TracklinkError| ConfigError::invalid("platforms", e.to_string()))?;
            if !order.contains(&platform) {
                order.push(platform);
            }
        }
        Ok(order)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            platforms: vec!["youtube".to_string(), "4shared".to_string()],
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            youtube_base_url: "https://www.youtube.com".to_string(),
            fourshared_base_url: "https://www.4shared.com".to_string(),
            max_variants: 3,
        }
    }
}

/// Live progress delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Events retained per job for replay to reconnecting subscribers
    pub backlog_capacity: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            backlog_capacity: 200,
        }
    }
}

/// Job retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Seconds a finished job is kept before it is purged
    pub retention_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3600,
        }
    }
}
