//! User configuration for the syndef CLI.
//!
//! Settings are read from a TOML file:
//!
//! ```toml
//! [diff]
//! column_width = 60
//!
//! [format]
//! output = "tree"
//! ```
//!
//! The file is looked up at `--config PATH` if given, otherwise at
//! `<config dir>/syndef/config.toml` (`~/.config/syndef/config.toml` on
//! Linux). A missing default file means all defaults; a missing explicit file
//! is an error. Command-line flags override file settings.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::commands::format::OutputFormat;

/// Application name used for directory paths.
const APP_NAME: &str = "syndef";

/// Config file name inside the application directory.
const CONFIG_FILE: &str = "config.toml";

/// Errors that can occur while loading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file
    #[error("failed to read config '{path}': {source}")]
    ReadFile {
        /// Path of the config file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        /// Path of the config file that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Resolved CLI configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub diff: DiffConfig,
    pub format: FormatConfig,
}

/// Settings for `syndef diff`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DiffConfig {
    /// Width each column is padded to.
    pub column_width: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { column_width: 50 }
    }
}

/// Settings for `syndef format`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FormatConfig {
    /// Output format used when `--output` is not given.
    pub output: OutputFormat,
}

/// Returns the default config file location, if a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}

impl Config {
    /// Loads the config from `explicit`, or from the default location if it
    /// exists, or falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parses a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
