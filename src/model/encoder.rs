use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::constants::validate_vector_dim;
use crate::model::backend::build_backend;
use crate::model::batching::Batcher;
use crate::model::codes::CodeMatrix;
use crate::model::error::ModelError;
use crate::model::persist::{EncoderSnapshot, read_snapshot, write_snapshot};
use crate::model::quantizer::{PqQuantizer, QuantizerState};
use crate::model::spec::ModelSpec;
use crate::model::trainer::{CodebookTrainer, StridedSampleTrainer};
use crate::model::vectorizer::{ChunkRef, Vectorizer};

/// Chunks in, codes out: vectorizer, batching adapter and product quantizer as one model.
#[derive(Debug)]
pub struct PipelineEncoder {
    spec: ModelSpec,
    vectorizer: Vectorizer,
    quantizer: PqQuantizer,
    trainer: Arc<dyn CodebookTrainer>,
}

impl PipelineEncoder {
    /// Builds an untrained encoder.
    pub fn from_spec(spec: ModelSpec) -> Result<Self, ModelError> {
        spec.validate()?;
        let state = QuantizerState::untrained(spec.shape());
        Self::assemble(spec, state)
    }

    pub fn from_spec_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let spec = ModelSpec::from_file(path)?;
        info!(path = %path.display(), "Building untrained encoder from spec");
        Self::from_spec(spec)
    }

    /// Loads a saved encoder; a missing dump is [`ModelError::NotFound`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let snapshot = read_snapshot(path)?;
        let encoder = Self::from_snapshot(&snapshot)?;
        info!(
            path = %path.display(),
            trained = encoder.is_trained(),
            backend = ?encoder.spec.backend,
            "Loaded encoder"
        );
        Ok(encoder)
    }

    pub fn from_snapshot(snapshot: &EncoderSnapshot) -> Result<Self, ModelError> {
        let spec = snapshot.spec();
        spec.validate()?;
        Self::assemble(spec, snapshot.quantizer.clone())
    }

    fn assemble(spec: ModelSpec, state: QuantizerState) -> Result<Self, ModelError> {
        validate_vector_dim(spec.vectorizer.dim(), state.shape().dim).map_err(|e| {
            ModelError::InvalidSpec {
                reason: format!("vectorizer does not match quantizer: {}", e),
            }
        })?;
        let batcher = Batcher::new(spec.batch_size)?;
        let quantizer = PqQuantizer::from_state(state, build_backend(spec.backend), batcher)?;
        Ok(Self {
            vectorizer: Vectorizer::new(spec.vectorizer),
            spec,
            quantizer,
            trainer: Arc::new(StridedSampleTrainer),
        })
    }

    /// Replaces the codebook trainer used by [`train`](Self::train).
    pub fn with_trainer(mut self, trainer: Arc<dyn CodebookTrainer>) -> Self {
        self.trainer = trainer;
        self
    }

    /// Persistable copy of the current state.
    pub fn snapshot(&self) -> EncoderSnapshot {
        EncoderSnapshot::new(&self.spec, self.quantizer.state().clone())
    }

    /// Atomically writes the encoder to `path`, returning the dump size.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<usize, ModelError> {
        write_snapshot(path.as_ref(), &self.snapshot())
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn is_trained(&self) -> bool {
        self.quantizer.is_trained()
    }

    pub fn dim(&self) -> usize {
        self.vectorizer.dim()
    }

    pub fn num_bytes(&self) -> usize {
        self.quantizer.num_bytes()
    }

    pub fn num_clusters(&self) -> usize {
        self.quantizer.num_clusters()
    }

    pub fn train(&mut self, chunks: &[ChunkRef<'_>]) -> Result<(), ModelError> {
        let vectors = self.vectorizer.vectorize(chunks)?;
        self.quantizer
            .train(&vectors, self.vectorizer.dim(), self.trainer.as_ref())
    }

    /// Encodes chunks into `[chunks.len(), num_bytes]` codes in `[1, num_clusters]`.
    pub fn encode(&self, chunks: &[ChunkRef<'_>]) -> Result<CodeMatrix, ModelError> {
        if !self.is_trained() {
            return Err(ModelError::NotTrained);
        }
        let vectors = self.vectorizer.vectorize(chunks)?;
        let codes = self.quantizer.encode(&vectors, self.vectorizer.dim())?;
        debug!(
            rows = codes.rows(),
            batches = self.quantizer.batcher().num_batches(chunks.len()),
            "Encoded chunks"
        );
        Ok(codes)
    }

    /// Releases backend resources.
    pub fn close(self) {
        self.quantizer.close();
        debug!("Encoder closed");
    }
}
