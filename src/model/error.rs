use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found at path: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to load model: {reason}")]
    LoadFailed { reason: String },

    #[error("failed to save model: {reason}")]
    SaveFailed { reason: String },

    #[error("invalid model spec: {reason}")]
    InvalidSpec { reason: String },

    #[error("model is not trained; train it before encoding")]
    NotTrained,

    #[error("invalid input shape: {reason}")]
    InvalidShape { reason: String },

    #[error("invalid chunk at position {index}: {reason}")]
    InvalidChunk { index: usize, reason: String },

    #[error("training failed: {reason}")]
    TrainingFailed { reason: String },

    #[error("backend computation failed: {reason}")]
    BackendFailed { reason: String },
}

impl ModelError {
    /// Contract violations by the caller (as opposed to I/O or backend faults).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ModelError::NotTrained | ModelError::InvalidShape { .. } | ModelError::InvalidChunk { .. }
        )
    }
}

impl From<candle_core::Error> for ModelError {
    fn from(err: candle_core::Error) -> Self {
        ModelError::BackendFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::LoadFailed {
            reason: err.to_string(),
        }
    }
}
