use std::sync::Arc;

use tokio::sync::watch;

use crate::model::EncoderSnapshot;

/// Published after every successful TRAIN message.
#[derive(Debug, Clone)]
pub struct ModelChanged {
    /// Increments by one per change, starting at 1.
    pub generation: u64,
    pub snapshot: Arc<EncoderSnapshot>,
}

/// Latest change, `None` until the model is first trained.
pub type ModelChangedReceiver = watch::Receiver<Option<ModelChanged>>;

#[derive(Debug)]
pub(crate) struct ModelEvents {
    tx: watch::Sender<Option<ModelChanged>>,
    generation: u64,
}

impl ModelEvents {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx, generation: 0 }
    }

    pub(crate) fn subscribe(&self) -> ModelChangedReceiver {
        self.tx.subscribe()
    }

    /// Stores the new snapshot for current and future subscribers.
    pub(crate) fn publish(&mut self, snapshot: EncoderSnapshot) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        self.tx.send_replace(Some(ModelChanged {
            generation,
            snapshot: Arc::new(snapshot),
        }));
        generation
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}
