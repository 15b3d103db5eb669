//! Configuration management for Longbox.
//!
//! Configuration is read from `~/.config/longbox/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is
//! created.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::app::LongboxError;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL of the weekly release list text export.
    pub feed_url: String,
    /// Detail page URL template; `{code}` is replaced per issue.
    pub detail_url: String,
    /// Rule file location. Defaults to `rules.json` next to the config.
    pub rules_path: Option<PathBuf>,
    /// Database location. Defaults to the platform data directory.
    pub db_path: Option<PathBuf>,
    /// Parallel detail fetches during enrichment.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "https://www.previewsworld.com/NewReleases/Export?format=txt".into(),
            detail_url: "https://www.previewsworld.com/Catalog/{code}".into(),
            rules_path: None,
            db_path: None,
            workers: 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the config directory")]
    NoConfigDir,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl From<ConfigError> for LongboxError {
    fn from(e: ConfigError) -> Self {
        LongboxError::Config(e.to_string())
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with
    /// comments. Missing fields in the config file use default values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_config_path()?)
    }

    pub fn load_from(config_path: PathBuf) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/longbox/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("longbox").join("config.toml"))
    }

    /// Where the rule file lives, honoring the override.
    pub fn rules_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.rules_path {
            return Ok(path.clone());
        }
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("longbox").join("rules.json"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Longbox Configuration
#
# Weekly release list export (plain text, tab separated).
feed_url = "https://www.previewsworld.com/NewReleases/Export?format=txt"

# Detail page per issue; {code} is replaced with the catalog code.
detail_url = "https://www.previewsworld.com/Catalog/{code}"

# Parallel detail fetches during enrichment.
workers = 8

# Uncomment to override file locations.
# rules_path = "/path/to/rules.json"
# db_path = "/path/to/longbox.db"
"##
        .to_string()
    }
}
