//! Configuration file support.
//!
//! Settings are stored as JSON. Every preference has a default, so a config
//! file only needs to name what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ANNOTATION_DIR, DEFAULT_KERNEL_SIZE, VENDOR_EXTENSION};
use crate::data::ProcessingMode;
use crate::store::TableFormat;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }

    /// Raise verbosity by `steps` levels, saturating at `Trace`.
    pub fn raised(self, steps: u8) -> Self {
        const ORDER: [LogLevel; 5] = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let current = ORDER.iter().position(|l| *l == self).unwrap_or(2);
        ORDER[(current + steps as usize).min(ORDER.len() - 1)]
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Application name (for identification)
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default)]
    pub preferences: Preferences,
}

fn default_app_name() -> String {
    "hsi-annotate".to_string()
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Extension of measurement files picked up by enumeration
    #[serde(default = "default_measurement_extension")]
    pub measurement_extension: String,

    /// Side length of the spectral averaging window
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,

    /// Root directory of the interactive annotation logs
    #[serde(default = "default_annotation_dir")]
    pub annotation_dir: PathBuf,

    /// Processing mode assumed for `.npy` measurements
    #[serde(default)]
    pub processing_mode: ProcessingMode,

    /// Table format used when the output path has no recognised extension
    #[serde(default)]
    pub table_format: TableFormat,
}

fn default_measurement_extension() -> String {
    VENDOR_EXTENSION.to_string()
}

fn default_kernel_size() -> usize {
    DEFAULT_KERNEL_SIZE
}

fn default_annotation_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ANNOTATION_DIR)
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            measurement_extension: default_measurement_extension(),
            kernel_size: default_kernel_size(),
            annotation_dir: default_annotation_dir(),
            processing_mode: ProcessingMode::default(),
            table_format: TableFormat::default(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: Preferences::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "hsi-annotate-config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("hsi-annotate").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("hsi-annotate")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from_path(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Load configuration from an explicit path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let config = AppConfig::new();
        let json = config.to_json().unwrap();
        let loaded = AppConfig::from_json(&json).unwrap();

        assert_eq!(loaded.version, CONFIG_VERSION);
        assert_eq!(loaded.app_name, "hsi-annotate");
        assert_eq!(loaded.preferences, Preferences::default());
    }

    #[test]
    fn test_missing_preferences_use_defaults() {
        let json = r#"{"version": 1, "preferences": {"kernel_size": 5, "table_format": "xlsx"}}"#;
        let config = AppConfig::from_json(json).unwrap();

        assert_eq!(config.preferences.kernel_size, 5);
        assert_eq!(config.preferences.table_format, TableFormat::Xlsx);
        assert_eq!(config.preferences.measurement_extension, "cu3s");
        assert_eq!(
            config.preferences.annotation_dir,
            PathBuf::from("point_annotations")
        );
        assert_eq!(
            config.preferences.processing_mode,
            ProcessingMode::Reflectance
        );
        assert_eq!(config.preferences.log_level, LogLevel::Info);
    }

    #[test]
    fn test_version_too_new() {
        let json = r#"{"version": 99}"#;
        let result = AppConfig::from_json(json);
        assert!(matches!(
            result,
            Err(ConfigError::VersionTooNew {
                file_version: 99,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            AppConfig::from_json("not json"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_and_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");

        let mut config = AppConfig::new();
        config.preferences.log_level = LogLevel::Debug;
        config.preferences.processing_mode = ProcessingMode::Raw;
        config.save_to_path(&path).unwrap();

        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.preferences.log_level, LogLevel::Debug);
        assert_eq!(loaded.preferences.processing_mode, ProcessingMode::Raw);
    }

    #[test]
    fn test_log_level_raised() {
        assert_eq!(LogLevel::Info.raised(0), LogLevel::Info);
        assert_eq!(LogLevel::Info.raised(1), LogLevel::Debug);
        assert_eq!(LogLevel::Warn.raised(7), LogLevel::Trace);
        assert_eq!(
            LogLevel::Debug.to_level_filter(),
            log::LevelFilter::Debug
        );
    }
}
