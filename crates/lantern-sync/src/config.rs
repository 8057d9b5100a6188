//! Sync driver configuration.
//!
//! Defaults mirror the protocol cadences: optimistic updates land once per
//! slot (~12 s), finality moves once per few epochs (~48 s polling is
//! plenty), and committee lookahead starts 8 epochs before a period ends.

use lantern_core::types::beacon::MAX_REQUEST_LIGHT_CLIENT_UPDATES;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors while loading or validating the configuration. Always fatal at
/// startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {reason}")]
    Invalid { reason: String },
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Base URL of the beacon node, e.g. `https://lodestar-mainnet.chainsafe.io`.
    pub beacon_endpoint: String,
    /// Deadline for a single HTTP request, in seconds.
    pub request_timeout_secs: u64,
    /// How often to poll for optimistic updates, in seconds.
    pub optimistic_poll_interval_secs: u64,
    /// How often to poll for finality updates, in seconds.
    pub finality_poll_interval_secs: u64,
    /// How many epochs before the end of a sync committee period to start
    /// fetching the next committee.
    pub lookahead_epochs: u64,
    /// Updates requested per catch-up chunk (the beacon API caps this at 128).
    pub updates_per_request: u64,
    /// Where to snapshot the verified store, if anywhere.
    pub store_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            beacon_endpoint: "https://lodestar-mainnet.chainsafe.io".to_string(),
            request_timeout_secs: 30,
            optimistic_poll_interval_secs: 12,
            finality_poll_interval_secs: 48,
            lookahead_epochs: 8,
            updates_per_request: MAX_REQUEST_LIGHT_CLIENT_UPDATES,
            store_path: None,
        }
    }
}

impl SyncConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: SyncConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.beacon_endpoint.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "beacon_endpoint must not be empty".to_string(),
            });
        }
        if self.updates_per_request == 0
            || self.updates_per_request > MAX_REQUEST_LIGHT_CLIENT_UPDATES
        {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "updates_per_request must be between 1 and {}, got {}",
                    MAX_REQUEST_LIGHT_CLIENT_UPDATES, self.updates_per_request
                ),
            });
        }
        if self.optimistic_poll_interval_secs == 0 || self.finality_poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "poll intervals must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
