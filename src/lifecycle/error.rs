use thiserror::Error;

use crate::config::ConfigError;
use crate::model::ModelError;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("failed to write checkpoint: {0}")]
    Model(#[from] ModelError),

    #[error("checkpoint task failed: {0}")]
    Task(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type CheckpointResult<T> = Result<T, CheckpointError>;
