use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info};

use crate::model::write_snapshot;
use crate::service::ModelChangedReceiver;

use super::config::CheckpointConfig;
use super::error::{CheckpointError, CheckpointResult};
use super::types::CheckpointOutcome;

/// Persists the model whenever the service publishes a change.
///
/// Works only on the immutable snapshots carried by model-changed events.
#[derive(Clone)]
pub struct CheckpointManager {
    config: CheckpointConfig,
    changes: ModelChangedReceiver,
    saved_generation: Arc<AtomicU64>,
    shutdown_initiated: Arc<AtomicBool>,
    watcher_running: Arc<AtomicBool>,
}

impl CheckpointManager {
    pub fn new(config: CheckpointConfig, changes: ModelChangedReceiver) -> Self {
        Self {
            config,
            changes,
            saved_generation: Arc::new(AtomicU64::new(0)),
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            watcher_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    /// Generation of the last snapshot written, `0` if none.
    pub fn saved_generation(&self) -> u64 {
        self.saved_generation.load(Ordering::Acquire)
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Writes the latest snapshot if it is newer than the last one written.
    pub async fn checkpoint(&self) -> CheckpointResult<CheckpointOutcome> {
        if !self.config.enabled {
            return Ok(CheckpointOutcome::Skipped {
                reason: "checkpointing disabled".to_string(),
            });
        }

        let Some(change) = self.changes.borrow().clone() else {
            return Ok(CheckpointOutcome::Clean);
        };
        if change.generation <= self.saved_generation() {
            return Ok(CheckpointOutcome::Clean);
        }

        let path = self.config.path.clone();
        let snapshot = Arc::clone(&change.snapshot);
        let bytes = tokio::task::spawn_blocking(move || write_snapshot(&path, &snapshot))
            .await
            .map_err(|e| CheckpointError::Task(e.to_string()))??;

        self.saved_generation
            .fetch_max(change.generation, Ordering::AcqRel);
        info!(
            generation = change.generation,
            bytes,
            path = %self.config.path.display(),
            "Checkpoint written"
        );
        Ok(CheckpointOutcome::Saved {
            bytes: bytes as u64,
            generation: change.generation,
        })
    }

    /// Starts the background watcher (no-op if already running).
    ///
    /// The task ends when the service drops its event sender or shutdown begins.
    pub fn start_watcher(&self) -> JoinHandle<()> {
        if self.watcher_running.swap(true, Ordering::AcqRel) {
            return tokio::spawn(async {});
        }

        let mut manager = self.clone();
        tokio::spawn(async move {
            while manager.changes.changed().await.is_ok() {
                if !manager.config.interval.is_zero() {
                    time::sleep(manager.config.interval).await;
                }
                if manager.is_shutdown_initiated() {
                    break;
                }
                if let Err(e) = manager.checkpoint().await {
                    error!(error = %e, "Checkpoint failed");
                }
            }
            debug!("Checkpoint watcher stopped");
            manager.watcher_running.store(false, Ordering::Release);
        })
    }

    /// Initiates shutdown (idempotent) and flushes the latest change once.
    pub async fn shutdown(&self) -> CheckpointResult<CheckpointOutcome> {
        if self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            return Ok(CheckpointOutcome::Skipped {
                reason: "already shut down".to_string(),
            });
        }
        self.checkpoint().await
    }
}

impl std::fmt::Debug for CheckpointManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointManager")
            .field("config", &self.config)
            .field("saved_generation", &self.saved_generation())
            .field("shutdown_initiated", &self.is_shutdown_initiated())
            .finish()
    }
}
