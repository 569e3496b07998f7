//! Configuration module for treeviewer
//!
//! Controls which browsers a viewer registers, the loader thread pool, the
//! thumbnail cache and prompting behaviour. Configuration is stored in the
//! user's config directory as TOML.

mod setup;

pub use setup::first_time_setup;

use crate::browser::BrowserKind;
use config::{Config, ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const fn default_worker_threads() -> usize {
    2
}

const fn default_cache_capacity() -> u64 {
    256
}

const fn default_ttl_secs() -> u64 {
    300
}

const fn default_true() -> bool {
    true
}

fn default_browsers() -> Vec<BrowserKind> {
    BrowserKind::all().to_vec()
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Application configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Browser selected and displayed on activation
    #[serde(default)]
    pub default_browser: BrowserKind,

    /// Browsers registered in every viewer
    #[serde(default = "default_browsers")]
    pub browsers: Vec<BrowserKind>,

    /// Size of the loader thread pool
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    #[serde(default = "default_cache_capacity")]
    pub thumbnail_cache_capacity: u64,

    #[serde(default = "default_ttl_secs")]
    pub thumbnail_ttl_secs: u64,

    /// Ask before deleting objects
    #[serde(default = "default_true")]
    pub confirm_delete: bool,

    /// tracing filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_browser: BrowserKind::default(),
            browsers: default_browsers(),
            worker_threads: default_worker_threads(),
            thumbnail_cache_capacity: default_cache_capacity(),
            thumbnail_ttl_secs: default_ttl_secs(),
            confirm_delete: true,
            log_filter: default_log_filter(),
        }
    }
}

impl ViewerConfig {
    /// Get the path to the config file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the system config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::Message("Could not determine config directory".to_string())
        })?;

        Ok(config_dir.join("treeviewer").join("config.toml"))
    }

    /// Load configuration from file, creating default if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file cannot be read, parsed, created
    /// or fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    /// Load and validate configuration from an explicit path
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the path cannot be determined or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the directory cannot be created, the
    /// configuration cannot be serialized to TOML, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::Message(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Check the invariants the viewer relies on
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.browsers.is_empty() {
            return Err(ConfigError::Message(
                "At least one browser must be registered".to_string(),
            ));
        }
        if !self.browsers.contains(&self.default_browser) {
            return Err(ConfigError::Message(format!(
                "Default browser '{}' is not registered",
                self.default_browser
            )));
        }
        let mut seen = self.browsers.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.browsers.len() {
            return Err(ConfigError::Message(
                "Browsers must not be listed twice".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Message(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.thumbnail_cache_capacity == 0 {
            return Err(ConfigError::Message(
                "thumbnail_cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn thumbnail_ttl(&self) -> Duration {
        Duration::from_secs(self.thumbnail_ttl_secs)
    }
}
