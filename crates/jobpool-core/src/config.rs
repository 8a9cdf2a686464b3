//! Pool tuning configuration.
//!
//! All knobs are supplied at process start and read-only thereafter. Every
//! field carries a serde default so a partial TOML table (or an empty one)
//! yields a working configuration; `validate` is fail-closed and rejects
//! values that would make leases or sweeps degenerate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantic validation failed.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Tuning knobs for the partitioned lease pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum number of entries a single partition may hold.
    #[serde(default = "default_max_entries_per_partition")]
    pub max_entries_per_partition: usize,

    /// Initial lease duration granted by `next`, in seconds.
    #[serde(default = "default_lease_duration_secs")]
    pub lease_duration_secs: u64,

    /// Lease extension applied by each successful `confirm`, in seconds.
    #[serde(default = "default_heartbeat_extend_secs")]
    pub heartbeat_extend_secs: u64,

    /// Absolute cap on lease lifetime from grant time, in seconds. A confirm
    /// arriving past this window terminates the lease no matter how often it
    /// was renewed.
    #[serde(default = "default_heartbeat_window_secs")]
    pub heartbeat_window_secs: u64,

    /// Entries older than this (since `reported_at`) are purged by the
    /// sweeper, in seconds.
    #[serde(default = "default_max_entry_age_secs")]
    pub max_entry_age_secs: u64,

    /// Reports with occupancy at or above this value are rejected.
    #[serde(default = "default_occupancy_accept_threshold")]
    pub occupancy_accept_threshold: u32,

    /// Reports with fewer than this many free slots are rejected.
    #[serde(default = "default_min_free_slots")]
    pub min_free_slots: u32,

    /// How long a handle stays vetoed after a successful confirm, in seconds.
    #[serde(default = "default_recent_use_ttl_secs")]
    pub recent_use_ttl_secs: u64,

    /// The recent-use veto only applies once a partition holds at least this
    /// many entries; smaller pools ignore it to avoid starvation.
    #[serde(default = "default_min_pool_size_for_veto")]
    pub min_pool_size_for_veto: usize,

    /// Minimum delay before a released handle may be granted again, in
    /// seconds.
    #[serde(default = "default_min_reassign_delay_secs")]
    pub min_reassign_delay_secs: u64,

    /// Freshness bonus window for candidate scoring, in seconds.
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: u64,

    /// Whether re-reporting a known handle refreshes its `reported_at`
    /// timestamp (affects age-based expiry and freshness scoring).
    #[serde(default = "default_refresh_reported_at_on_report")]
    pub refresh_reported_at_on_report: bool,

    /// Background sweep interval, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

const fn default_max_entries_per_partition() -> usize {
    500
}
const fn default_lease_duration_secs() -> u64 {
    10
}
const fn default_heartbeat_extend_secs() -> u64 {
    15
}
const fn default_heartbeat_window_secs() -> u64 {
    300
}
const fn default_max_entry_age_secs() -> u64 {
    900
}
const fn default_occupancy_accept_threshold() -> u32 {
    12
}
const fn default_min_free_slots() -> u32 {
    1
}
const fn default_recent_use_ttl_secs() -> u64 {
    8
}
const fn default_min_pool_size_for_veto() -> usize {
    4
}
const fn default_min_reassign_delay_secs() -> u64 {
    3
}
const fn default_freshness_window_secs() -> u64 {
    120
}
const fn default_refresh_reported_at_on_report() -> bool {
    true
}
const fn default_sweep_interval_secs() -> u64 {
    30
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_entries_per_partition: default_max_entries_per_partition(),
            lease_duration_secs: default_lease_duration_secs(),
            heartbeat_extend_secs: default_heartbeat_extend_secs(),
            heartbeat_window_secs: default_heartbeat_window_secs(),
            max_entry_age_secs: default_max_entry_age_secs(),
            occupancy_accept_threshold: default_occupancy_accept_threshold(),
            min_free_slots: default_min_free_slots(),
            recent_use_ttl_secs: default_recent_use_ttl_secs(),
            min_pool_size_for_veto: default_min_pool_size_for_veto(),
            min_reassign_delay_secs: default_min_reassign_delay_secs(),
            freshness_window_secs: default_freshness_window_secs(),
            refresh_reported_at_on_report: default_refresh_reported_at_on_report(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl PoolConfig {
    /// Parses configuration from a TOML string and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed, contains unknown fields,
    /// or fails semantic validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries_per_partition == 0 {
            return Err(ConfigError::Validation(
                "max_entries_per_partition must be greater than zero".to_string(),
            ));
        }
        if self.lease_duration_secs == 0 {
            return Err(ConfigError::Validation(
                "lease_duration_secs must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_extend_secs == 0 {
            return Err(ConfigError::Validation(
                "heartbeat_extend_secs must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_window_secs < self.lease_duration_secs {
            return Err(ConfigError::Validation(format!(
                "heartbeat_window_secs ({}) must be at least lease_duration_secs ({})",
                self.heartbeat_window_secs, self.lease_duration_secs
            )));
        }
        if self.max_entry_age_secs == 0 {
            return Err(ConfigError::Validation(
                "max_entry_age_secs must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Lease duration in milliseconds.
    #[must_use]
    pub const fn lease_duration_ms(&self) -> u64 {
        self.lease_duration_secs * 1000
    }

    /// Heartbeat extension in milliseconds.
    #[must_use]
    pub const fn heartbeat_extend_ms(&self) -> u64 {
        self.heartbeat_extend_secs * 1000
    }

    /// Heartbeat window in milliseconds.
    #[must_use]
    pub const fn heartbeat_window_ms(&self) -> u64 {
        self.heartbeat_window_secs * 1000
    }

    /// Maximum entry age in milliseconds.
    #[must_use]
    pub const fn max_entry_age_ms(&self) -> u64 {
        self.max_entry_age_secs * 1000
    }

    /// Recent-use veto TTL in milliseconds.
    #[must_use]
    pub const fn recent_use_ttl_ms(&self) -> u64 {
        self.recent_use_ttl_secs * 1000
    }

    /// Minimum re-assignment delay in milliseconds.
    #[must_use]
    pub const fn min_reassign_delay_ms(&self) -> u64 {
        self.min_reassign_delay_secs * 1000
    }
}
