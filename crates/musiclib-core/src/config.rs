//! Application configuration management.
//!
//! Handles loading and saving the client settings: where the catalog API
//! lives, how long a confirm gesture stays armed, and network timeouts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Default catalog API location.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default confirm-gesture window in milliseconds.
pub const DEFAULT_CONFIRM_WINDOW_MS: u64 = 1000;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const fn default_confirm_window_ms() -> u64 {
    DEFAULT_CONFIRM_WINDOW_MS
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the catalog API.
    pub api_base_url: String,
    /// How long a card stays armed after the first click.
    #[serde(default = "default_confirm_window_ms")]
    pub confirm_window_ms: u64,
    /// Total timeout for a catalog request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for establishing a connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            confirm_window_ms: DEFAULT_CONFIRM_WINDOW_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, or create default if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        if !config_path.exists() {
            debug!("Config file not found, using defaults");
            let config = Self::default();
            if let Err(e) = config.save() {
                warn!("Failed to save default config: {}", e);
            }
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        debug!(api_base_url = %config.api_base_url, "Catalog API");

        Ok(config)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Configuration(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Configuration(format!(
                "API base URL must start with http:// or https://: {url}"
            )));
        }
        let zero_field = [
            ("Confirm window", self.confirm_window_ms),
            ("Request timeout", self.request_timeout_secs),
            ("Connect timeout", self.connect_timeout_secs),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);
        if let Some((field, _)) = zero_field {
            return Err(Error::Configuration(format!("{field} must be greater than zero")));
        }
        Ok(())
    }

    /// Confirm-gesture window as a duration.
    #[must_use]
    pub const fn confirm_window(&self) -> Duration {
        Duration::from_millis(self.confirm_window_ms)
    }

    /// Request timeout as a duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout as a duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Get the path to the config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }
}

/// Get the path to the config file.
fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("musiclib")
        .join("config.json")
}
