//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `QUANTSTAGE_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::DEFAULT_SEND_TIMEOUT_MS;
use crate::service::{DEFAULT_DUMP_PATH, DEFAULT_SERVICE_NAME, ServiceConfig};
use crate::wire::Mode;

/// Default inbound (pull) address.
pub const DEFAULT_PULL_ADDR: &str = "127.0.0.1:5310";

/// Default outbound (push) address.
pub const DEFAULT_PUSH_ADDR: &str = "127.0.0.1:5311";

/// Stage configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `QUANTSTAGE_*` overrides on top of defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Which messages this replica is deployed for. Default: `index`.
    pub mode: Mode,

    /// Trained model dump. Default: `./.data/encoder.rkyv`.
    pub dump_path: PathBuf,

    /// JSON model spec for bootstrapping in TRAIN mode.
    pub model_spec: Option<PathBuf>,

    /// Outbound send timeout in milliseconds. Default: `5000`.
    pub send_timeout_ms: u64,

    /// Address the pull socket binds. Default: `127.0.0.1:5310`.
    pub pull_addr: String,

    /// Address the push socket connects to. Default: `127.0.0.1:5311`.
    pub push_addr: String,

    /// Name used in diagnostics. Default: `EncoderService`.
    pub service_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            dump_path: PathBuf::from(DEFAULT_DUMP_PATH),
            model_spec: None,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            pull_addr: DEFAULT_PULL_ADDR.to_string(),
            push_addr: DEFAULT_PUSH_ADDR.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl Config {
    const ENV_MODE: &'static str = "QUANTSTAGE_MODE";
    const ENV_DUMP_PATH: &'static str = "QUANTSTAGE_DUMP_PATH";
    const ENV_MODEL_SPEC: &'static str = "QUANTSTAGE_MODEL_SPEC";
    const ENV_SEND_TIMEOUT_MS: &'static str = "QUANTSTAGE_SEND_TIMEOUT_MS";
    const ENV_PULL_ADDR: &'static str = "QUANTSTAGE_PULL_ADDR";
    const ENV_PUSH_ADDR: &'static str = "QUANTSTAGE_PUSH_ADDR";
    const ENV_SERVICE_NAME: &'static str = "QUANTSTAGE_SERVICE_NAME";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mode = Self::parse_mode_from_env(defaults.mode)?;
        let dump_path = parse_path_from_env(Self::ENV_DUMP_PATH, defaults.dump_path);
        let model_spec = parse_optional_path_from_env(Self::ENV_MODEL_SPEC);
        let send_timeout_ms = parse_u64_from_env(Self::ENV_SEND_TIMEOUT_MS, defaults.send_timeout_ms)?;
        let pull_addr = parse_string_from_env(Self::ENV_PULL_ADDR, defaults.pull_addr);
        let push_addr = parse_string_from_env(Self::ENV_PUSH_ADDR, defaults.push_addr);
        let service_name = parse_string_from_env(Self::ENV_SERVICE_NAME, defaults.service_name);

        Ok(Self {
            mode,
            dump_path,
            model_spec,
            send_timeout_ms,
            pull_addr,
            push_addr,
            service_name,
        })
    }

    /// Validates addresses, timeout and paths (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.send_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        validate_addr(Self::ENV_PULL_ADDR, &self.pull_addr)?;
        validate_addr(Self::ENV_PUSH_ADDR, &self.push_addr)?;

        if self.dump_path.is_dir() {
            return Err(ConfigError::NotAFile {
                path: self.dump_path.clone(),
            });
        }
        if let Some(parent) = self.dump_path.parent()
            && parent.exists()
            && !parent.is_dir()
        {
            return Err(ConfigError::NotADirectory {
                path: parent.to_path_buf(),
            });
        }

        if let Some(ref path) = self.model_spec {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        Ok(())
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Settings handed to the encoder service.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            name: self.service_name.clone(),
            mode: self.mode,
            dump_path: self.dump_path.clone(),
            model_spec: self.model_spec.clone(),
            send_timeout: self.send_timeout(),
        }
    }

    fn parse_mode_from_env(default: Mode) -> Result<Mode, ConfigError> {
        match env::var(Self::ENV_MODE) {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidMode { value }),
            Err(_) => Ok(default),
        }
    }
}

fn validate_addr(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = value
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidAddr {
            name,
            value: value.to_string(),
        })
    }
}

pub(crate) fn parse_path_from_env(name: &str, default: PathBuf) -> PathBuf {
    env::var(name).map(PathBuf::from).unwrap_or(default)
}

pub(crate) fn parse_optional_path_from_env(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

pub(crate) fn parse_string_from_env(name: &str, default: String) -> String {
    env::var(name).unwrap_or(default)
}

pub(crate) fn parse_u64_from_env(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidNumber {
                name,
                value,
                source: e,
            }),
        Err(_) => Ok(default),
    }
}

pub(crate) fn parse_bool_from_env(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidBool { name, value }),
        },
        Err(_) => Ok(default),
    }
}
