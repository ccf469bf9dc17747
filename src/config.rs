// zjs Runtime Configuration
// Loaded from zjs.json; every field has a default

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name looked up by the CLI
pub const CONFIG_FILE: &str = "zjs.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Log namespace, class and mixin definitions at trace level
    pub trace: bool,
    /// Colored console output
    pub color: bool,
    /// Install the `zjs` builtin namespace at startup
    pub builtins: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            trace: false,
            color: true,
            builtins: true,
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
