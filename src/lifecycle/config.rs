use std::path::PathBuf;
use std::time::Duration;

use crate::config::{parse_bool_from_env, parse_path_from_env, parse_u64_from_env};
use crate::service::DEFAULT_DUMP_PATH;

use super::error::CheckpointResult;

/// Default quiet period after a model change before it is written.
pub const DEFAULT_CHECKPOINT_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Where and how often trained models are persisted.
pub struct CheckpointConfig {
    /// Disabled managers report every checkpoint as skipped.
    pub enabled: bool,
    /// Model dump written on each checkpoint.
    pub path: PathBuf,
    /// Changes arriving within this window are coalesced into one write.
    pub interval: Duration,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_DUMP_PATH),
            interval: Duration::from_secs(DEFAULT_CHECKPOINT_INTERVAL_SECS),
        }
    }
}

impl CheckpointConfig {
    const ENV_ENABLED: &'static str = "QUANTSTAGE_CHECKPOINT_ENABLED";
    const ENV_PATH: &'static str = "QUANTSTAGE_DUMP_PATH";
    const ENV_INTERVAL_SECS: &'static str = "QUANTSTAGE_CHECKPOINT_INTERVAL_SECS";

    /// Loads config from environment variables (with defaults).
    pub fn from_env() -> CheckpointResult<Self> {
        let defaults = Self::default();
        let enabled = parse_bool_from_env(Self::ENV_ENABLED, defaults.enabled)?;
        let path = parse_path_from_env(Self::ENV_PATH, defaults.path);
        let interval = parse_u64_from_env(Self::ENV_INTERVAL_SECS, defaults.interval.as_secs())
            .map(Duration::from_secs)?;

        Ok(Self {
            enabled,
            path,
            interval,
        })
    }

    #[cfg(test)]
    pub fn for_testing(path: PathBuf) -> Self {
        Self {
            enabled: true,
            path,
            interval: Duration::ZERO,
        }
    }
}
