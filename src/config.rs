//! Configuration management for contemplative-md
//!
//! Handles loading and validating the pipeline configuration. Configuration is
//! read from a JSON file; every field has a default so a missing file or a
//! partial file both work.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier used for the configuration directory
pub const APP_ID: &str = "contemplative-md";

/// Name of the configuration file inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Largest file the code viewer will highlight (in bytes) - 512 KiB
pub const MAX_VIEWABLE_FILE_SIZE: u64 = 512 * 1024;

/// Number of leading bytes inspected by the binary heuristic - 8 KiB
pub const BINARY_SAMPLE_SIZE: usize = 8 * 1024;

/// Share of control bytes in the sample above which content counts as binary
pub const BINARY_CONTROL_THRESHOLD: f64 = 0.10;

/// Message shown in the error placeholder when rendering fails
pub const DEFAULT_ERROR_MESSAGE: &str = "This content could not be displayed.";

/// Pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site identity used for link classification
    pub site: SiteConfig,

    /// Code-file viewer limits
    pub viewer: ViewerConfig,

    /// Prose rendering options
    pub render: RenderConfig,
}

impl Config {
    /// Load configuration from the default location or return defaults
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            log::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific JSON file
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&raw)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        let config: Config =
            serde_json::from_str(raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde alone cannot constrain
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(origin) = &self.site.origin {
            url::Url::parse(origin).map_err(|e| ConfigError::InvalidValue {
                key: "site.origin".to_string(),
                reason: e.to_string(),
            })?;
        }

        let threshold = self.viewer.binary_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::InvalidValue {
                key: "viewer.binary_threshold".to_string(),
                reason: format!("{} is outside (0, 1]", threshold),
            });
        }

        if self.viewer.binary_sample_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "viewer.binary_sample_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Get the configuration directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Get the default configuration file path
    pub fn config_path() -> ConfigResult<PathBuf> {
        Self::config_dir().map(|p| p.join(CONFIG_FILE_NAME))
    }
}

/// Site identity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// The site's own origin, e.g. `https://example.com`.
    /// Absolute links to this origin are treated as internal.
    pub origin: Option<String>,
}

/// Limits for the code-file viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Maximum content size in UTF-8 bytes
    pub max_file_size: u64,

    /// Leading bytes inspected by the binary heuristic
    pub binary_sample_size: usize,

    /// Control-byte ratio above which the sample counts as binary
    pub binary_threshold: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            max_file_size: MAX_VIEWABLE_FILE_SIZE,
            binary_sample_size: BINARY_SAMPLE_SIZE,
            binary_threshold: BINARY_CONTROL_THRESHOLD,
        }
    }
}

/// Prose rendering options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Message shown in the accessible error placeholder
    pub error_message: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }
}
