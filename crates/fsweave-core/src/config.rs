//! Engine configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration for the task engine and the transfer orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Number of blocking jobs allowed to run at once.
    #[builder(default = "4")]
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    /// Capacity of each task's event channel.
    #[builder(default = "100")]
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Copy chunk size in bytes; one chunk is one progress tick.
    #[builder(default = "65536")]
    #[serde(default = "default_copy_buffer_size")]
    pub copy_buffer_size: usize,

    /// Carry permissions and modification time over to copies.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_metadata: bool,

    /// Report the metadata of symlink targets instead of the links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks_in_listing: bool,
}

fn default_max_concurrent_tasks() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    100
}

fn default_copy_buffer_size() -> usize {
    64 * 1024
}

fn default_true() -> bool {
    true
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_tasks == Some(0) {
            return Err("max_concurrent_tasks must be at least 1".to_string());
        }
        if self.channel_capacity == Some(0) {
            return Err("channel_capacity must be at least 1".to_string());
        }
        if self.copy_buffer_size == Some(0) {
            return Err("copy_buffer_size must be at least 1".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The per-user config file location, `<config_dir>/fsweave/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fsweave")
            .join("config.toml")
    }

    fn check(&self) -> Result<(), ConfigError> {
        let zero = [
            ("max_concurrent_tasks", self.max_concurrent_tasks),
            ("channel_capacity", self.channel_capacity),
            ("copy_buffer_size", self.copy_buffer_size),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);

        match zero {
            Some((name, _)) => Err(ConfigError::Invalid {
                message: format!("{name} must be at least 1"),
            }),
            None => Ok(()),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent_tasks(),
            channel_capacity: default_channel_capacity(),
            copy_buffer_size: default_copy_buffer_size(),
            preserve_metadata: true,
            follow_symlinks_in_listing: false,
        }
    }
}
