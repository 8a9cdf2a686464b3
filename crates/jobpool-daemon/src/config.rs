//! Daemon configuration: TOML file plus environment overrides.
//!
//! The file supplies everything; a handful of deployment knobs can also be
//! overridden through `JOBPOOL_*` environment variables so the same file
//! works across environments. Validation is fail-closed: a daemon with no
//! API key refuses to start rather than serving unauthenticated.

use std::net::SocketAddr;
use std::path::Path;

use jobpool_core::PoolConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the bind address.
pub const ENV_BIND: &str = "JOBPOOL_BIND";
/// Environment variable overriding the API key.
pub const ENV_API_KEY: &str = "JOBPOOL_API_KEY";

/// Errors produced while loading daemon configuration.
#[derive(Debug, Error)]
pub enum DaemonConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The pool section failed validation.
    #[error(transparent)]
    Pool(#[from] jobpool_core::ConfigError),

    /// Semantic validation failed.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Shared secret required in `x-api-key` on mutating endpoints.
    #[serde(default)]
    pub api_key: String,

    /// Pool tuning knobs.
    #[serde(default)]
    pub pool: PoolConfig,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 10_000))
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_key: String::new(),
            pool: PoolConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Parses configuration from a TOML string, without env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the pool section fails
    /// validation. The API key is checked later, in [`Self::validate`], so
    /// an env-supplied key can still satisfy it.
    pub fn from_toml(content: &str) -> Result<Self, DaemonConfigError> {
        let config: Self = toml::from_str(content)?;
        config.pool.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, DaemonConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Applies `JOBPOOL_*` environment overrides on top of the file values.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is present but unparseable.
    pub fn apply_env_overrides(&mut self) -> Result<(), DaemonConfigError> {
        if let Ok(bind) = std::env::var(ENV_BIND) {
            self.bind = bind.parse().map_err(|_| {
                DaemonConfigError::Validation(format!("{ENV_BIND} is not a socket address: {bind}"))
            })?;
        }
        if let Ok(api_key) = std::env::var(ENV_API_KEY) {
            self.api_key = api_key;
        }
        Ok(())
    }

    /// Final validation after file load and env overrides.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the API key is missing.
    pub fn validate(&self) -> Result<(), DaemonConfigError> {
        if self.api_key.is_empty() {
            return Err(DaemonConfigError::Validation(format!(
                "api_key is required (set it in the config file or via {ENV_API_KEY})"
            )));
        }
        Ok(())
    }
}
