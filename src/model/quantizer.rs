//! Product quantizer: nearest-centroid assignment per sub-vector.

use rkyv::{Archive, Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{CODE_OFFSET, MAX_NUM_CLUSTERS, PqShape};
use crate::model::backend::NearestCentroid;
use crate::model::batching::Batcher;
use crate::model::codes::CodeMatrix;
use crate::model::error::ModelError;
use crate::model::trainer::CodebookTrainer;

/// Persisted quantizer fields. Holds no backend resources.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct QuantizerState {
    /// Sub-vectors per vector.
    pub num_bytes: u32,
    /// Centroids per sub-vector.
    pub num_clusters: u32,
    /// Dimension of each sub-vector.
    pub subvector_dim: u32,
    /// `[num_bytes][num_clusters][subvector_dim]`, empty until trained.
    pub centroids: Vec<f32>,
    pub is_trained: bool,
}

impl QuantizerState {
    /// Untrained state for a validated layout.
    pub fn untrained(shape: PqShape) -> Self {
        Self {
            num_bytes: shape.num_bytes as u32,
            num_clusters: shape.num_clusters as u32,
            subvector_dim: shape.subvector_dim() as u32,
            centroids: Vec::new(),
            is_trained: false,
        }
    }

    pub fn shape(&self) -> PqShape {
        let num_bytes = self.num_bytes as usize;
        PqShape::new(
            num_bytes * self.subvector_dim as usize,
            num_bytes,
            self.num_clusters as usize,
        )
    }

    /// Logical centroid tensor shape `[1, num_bytes, num_clusters, subvector_dim]`.
    pub fn centroid_shape(&self) -> [usize; 4] {
        [
            1,
            self.num_bytes as usize,
            self.num_clusters as usize,
            self.subvector_dim as usize,
        ]
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.shape()
            .validate()
            .map_err(|e| ModelError::InvalidSpec {
                reason: e.to_string(),
            })?;

        if self.is_trained && self.centroids.len() != self.shape().codebook_len() {
            return Err(ModelError::InvalidSpec {
                reason: format!(
                    "codebook has {} values, expected {}",
                    self.centroids.len(),
                    self.shape().codebook_len()
                ),
            });
        }

        Ok(())
    }
}

/// Trainable product quantizer bound to a numeric backend.
///
/// The backend holds device resources for the current codebook; they are released on
/// [`close`](Self::close) or drop.
#[derive(Debug)]
pub struct PqQuantizer {
    state: QuantizerState,
    backend: Box<dyn NearestCentroid>,
    batcher: Batcher,
}

impl PqQuantizer {
    /// Builds a quantizer from (possibly trained) state.
    pub fn from_state(
        state: QuantizerState,
        mut backend: Box<dyn NearestCentroid>,
        batcher: Batcher,
    ) -> Result<Self, ModelError> {
        state.validate()?;
        if state.is_trained {
            backend.prepare(&state)?;
        }
        debug!(
            backend = ?backend.kind(),
            num_bytes = state.num_bytes,
            num_clusters = state.num_clusters,
            trained = state.is_trained,
            "Quantizer ready"
        );
        Ok(Self {
            state,
            backend,
            batcher,
        })
    }

    pub fn state(&self) -> &QuantizerState {
        &self.state
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_trained
    }

    pub fn num_bytes(&self) -> usize {
        self.state.num_bytes as usize
    }

    pub fn num_clusters(&self) -> usize {
        self.state.num_clusters as usize
    }

    pub fn batcher(&self) -> Batcher {
        self.batcher
    }

    /// Fits a new codebook and rebinds the backend to it.
    ///
    /// The previous codebook stays active if fitting or backend preparation fails.
    pub fn train(
        &mut self,
        vectors: &[f32],
        dim: usize,
        trainer: &dyn CodebookTrainer,
    ) -> Result<(), ModelError> {
        let rows = self.check_input(vectors, dim)?;
        let shape = self.state.shape();

        let centroids = trainer.fit(vectors, shape)?;
        if centroids.len() != shape.codebook_len() {
            return Err(ModelError::TrainingFailed {
                reason: format!(
                    "trainer returned {} values, expected {}",
                    centroids.len(),
                    shape.codebook_len()
                ),
            });
        }

        let trained = QuantizerState {
            centroids,
            is_trained: true,
            ..self.state.clone()
        };
        self.backend.prepare(&trained)?;
        self.state = trained;

        info!(
            rows,
            num_bytes = self.state.num_bytes,
            num_clusters = self.state.num_clusters,
            "Quantizer trained"
        );
        Ok(())
    }

    /// Encodes `[rows, dim]` vectors into `[rows, num_bytes]` 1-based codes.
    pub fn encode(&self, vectors: &[f32], dim: usize) -> Result<CodeMatrix, ModelError> {
        if !self.state.is_trained {
            return Err(ModelError::NotTrained);
        }
        let rows = self.check_input(vectors, dim)?;
        let num_clusters = self.num_clusters();

        let indices = self.batcher.run(rows, |range| {
            let slice = &vectors[range.start * dim..range.end * dim];
            self.backend.assign(slice, range.len())
        })?;

        if indices.len() != rows * self.num_bytes() {
            return Err(ModelError::BackendFailed {
                reason: format!(
                    "backend returned {} assignments for {} rows",
                    indices.len(),
                    rows
                ),
            });
        }

        let mut codes = Vec::with_capacity(indices.len());
        for index in indices {
            let index = index as usize;
            if index >= num_clusters || index >= MAX_NUM_CLUSTERS {
                return Err(ModelError::BackendFailed {
                    reason: format!("centroid index {} out of range", index),
                });
            }
            codes.push(index as u8 + CODE_OFFSET);
        }

        CodeMatrix::new(self.num_bytes(), codes).map_err(|e| ModelError::BackendFailed {
            reason: e.to_string(),
        })
    }

    /// Releases backend resources.
    pub fn close(mut self) {
        self.backend.release();
    }

    fn check_input(&self, vectors: &[f32], dim: usize) -> Result<usize, ModelError> {
        let num_bytes = self.num_bytes();
        if dim == 0 || !dim.is_multiple_of(num_bytes) {
            return Err(ModelError::InvalidShape {
                reason: format!(
                    "vector dimension {} cannot be split into {} sub-vectors",
                    dim, num_bytes
                ),
            });
        }
        if dim / num_bytes != self.state.subvector_dim as usize {
            return Err(ModelError::InvalidShape {
                reason: format!(
                    "sub-vector dimension {} does not match codebook dimension {}",
                    dim / num_bytes,
                    self.state.subvector_dim
                ),
            });
        }
        if !vectors.len().is_multiple_of(dim) {
            return Err(ModelError::InvalidShape {
                reason: format!(
                    "{} values do not form whole vectors of dimension {}",
                    vectors.len(),
                    dim
                ),
            });
        }
        Ok(vectors.len() / dim)
    }
}
