//! Configuration — the posting-application base URL and default app.
//!
//! Precedence: command-line flag over config file over built-in default.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Fallback base URL for posting-application locations.
pub const DEFAULT_APP_BASE_URL: &str = "https://apps.posting.dev";

/// Application opened when a trigger names none.
pub const DEFAULT_APP_NAME: &str = "Message";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL for constructing posting-application locations.
    pub app_base_url: String,
    /// Application used for default (un-named) triggers.
    pub default_app: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_base_url: DEFAULT_APP_BASE_URL.to_string(),
            default_app: DEFAULT_APP_NAME.to_string(),
        }
    }
}

impl Config {
    /// Load from a JSON file; `None` yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply command-line overrides on top of the loaded values.
    pub fn apply_overrides(&mut self, app_base_url: Option<String>, default_app: Option<String>) {
        if let Some(base) = app_base_url {
            self.app_base_url = base;
        }
        if let Some(app) = default_app {
            self.default_app = app;
        }
    }
}
