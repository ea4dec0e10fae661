//! Model checkpointing driven by model-changed events.

pub mod config;
pub mod error;
pub mod manager;
pub mod types;


pub use config::{CheckpointConfig, DEFAULT_CHECKPOINT_INTERVAL_SECS};
pub use error::{CheckpointError, CheckpointResult};
pub use manager::CheckpointManager;
pub use types::CheckpointOutcome;
