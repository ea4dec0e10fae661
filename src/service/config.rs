use std::path::PathBuf;
use std::time::Duration;

use crate::constants::DEFAULT_SEND_TIMEOUT_MS;
use crate::wire::Mode;

pub const DEFAULT_SERVICE_NAME: &str = "EncoderService";
pub const DEFAULT_DUMP_PATH: &str = "./.data/encoder.rkyv";

/// Settings the encoder stage needs at startup and per message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Reported in unsupported-mode and startup errors.
    pub name: String,
    pub mode: Mode,
    /// Trained model dump.
    pub dump_path: PathBuf,
    /// JSON model spec used to bootstrap an untrained model in TRAIN mode.
    pub model_spec: Option<PathBuf>,
    pub send_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVICE_NAME.to_string(),
            mode: Mode::default(),
            dump_path: PathBuf::from(DEFAULT_DUMP_PATH),
            model_spec: None,
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
        }
    }
}
