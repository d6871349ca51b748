//! # Plexus Core Runtime Configuration
//!
//! [`RuntimeConfig`] holds the framework-wide settings: the framework start
//! level, the directories scanned for plugins, the log level and the starter
//! policies. It can be loaded from JSON, YAML (feature `yaml-config`) or TOML
//! (feature `toml-config`); the format follows the file extension.
pub mod error;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use error::ConfigError;

use crate::kernel::constants::{DEFAULT_FRAMEWORK_START_LEVEL, DEFAULT_LOG_LEVEL, DEFAULT_PLUGINS_DIR};
use crate::plugin_system::starter::{DependencyFailurePolicy, StarterPolicy, StopOrder};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Framework-wide settings. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RuntimeConfig {
    /// Plugins with a higher start level are never started.
    pub start_level: i32,
    /// Directories whose first-level subdirectories are scanned for plugins.
    pub plugin_dirs: Vec<PathBuf>,
    pub log_level: String,
    pub dependency_failure: DependencyFailurePolicy,
    pub stop_order: StopOrder,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            start_level: DEFAULT_FRAMEWORK_START_LEVEL,
            plugin_dirs: vec![PathBuf::from(DEFAULT_PLUGINS_DIR)],
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            dependency_failure: DependencyFailurePolicy::default(),
            stop_order: StopOrder::default(),
        }
    }
}

impl RuntimeConfig {
    /// Loads a configuration file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content, format)?;

        // Relative plugin directories are relative to the configuration file.
        if let Some(base) = path.parent() {
            for dir in &mut config.plugin_dirs {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
        Ok(config)
    }

    /// Parses configuration content in the given format.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let parse_error = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::Parse {
            format: format.extension(),
            source,
        };
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| parse_error(Box::new(e))),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| parse_error(Box::new(e))),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_error(Box::new(e))),
        }
    }

    /// Serializes the configuration in the given format.
    pub fn serialize(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        let serialize_error = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::Serialize {
            format: format.extension(),
            source,
        };
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| serialize_error(Box::new(e))),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| serialize_error(Box::new(e))),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| serialize_error(Box::new(e))),
        }
    }

    pub fn starter_policy(&self) -> StarterPolicy {
        StarterPolicy {
            dependency_failure: self.dependency_failure,
            stop_order: self.stop_order,
        }
    }
}
