//! Configuration loading for Ordo.
//!
//! Configuration lives in a single TOML file, `~/.ordo/config.toml` unless
//! `ORDO_CONFIG` points elsewhere. Every section is optional; a missing file is
//! not an error.
//!
//! ```toml
//! [logging]
//! filter = "ordo_queue=debug,info"
//!
//! [launch]
//! default_priority = "utility"
//!
//! [bridge]
//! reply_timeout_ms = 30000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use ordo_types::TaskPriority;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "ORDO_CONFIG";

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrdoConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive. `RUST_LOG` takes precedence when set.
    pub filter: Option<String>,
}

impl LoggingConfig {
    #[must_use]
    pub fn filter_or_default(&self) -> &str {
        self.filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchConfig {
    /// Priority applied to ordered launches that don't pass one.
    pub default_priority: Option<TaskPriority>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Upper bound on how long a bridged call waits for its reply.
    /// Absent means wait until the reply or a transport failure.
    pub reply_timeout_ms: Option<u64>,
}

impl BridgeConfig {
    #[must_use]
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl OrdoConfig {
    /// Load from the default location. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match Self::parse(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV)
        && !explicit.is_empty()
    {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".ordo").join("config.toml"))
}
