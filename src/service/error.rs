use thiserror::Error;

use crate::model::ModelError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No trained model and no usable fallback; the service must not serve.
    #[error("{component} could not be loaded: {reason}")]
    ComponentNotLoaded { component: String, reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("invalid message: {reason}")]
    Validation { reason: String },

    #[error("{service} does not support mode {value}")]
    UnsupportedMode { service: String, value: i32 },

    #[error("{service} does not support doc type {value}")]
    UnsupportedDocType { service: String, value: i32 },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Coarse error class used in per-message failure logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Startup,
    Configuration,
    Validation,
    UnsupportedMode,
    UnsupportedDocType,
    Model,
    TransportTimeout,
    Transport,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::ComponentNotLoaded { .. } => ErrorKind::Startup,
            ServiceError::Configuration { .. } => ErrorKind::Configuration,
            ServiceError::Validation { .. } => ErrorKind::Validation,
            ServiceError::UnsupportedMode { .. } => ErrorKind::UnsupportedMode,
            ServiceError::UnsupportedDocType { .. } => ErrorKind::UnsupportedDocType,
            ServiceError::Model(e) if e.is_validation() => ErrorKind::Validation,
            ServiceError::Model(_) => ErrorKind::Model,
            ServiceError::Transport(TransportError::Timeout { .. }) => ErrorKind::TransportTimeout,
            ServiceError::Transport(_) => ErrorKind::Transport,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
