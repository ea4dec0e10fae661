use std::fmt;

use crate::constants::PqShape;
use crate::model::error::ModelError;

/// Produces a codebook from training vectors.
///
/// Implementations return `num_bytes * num_clusters * subvector_dim` values laid out as
/// `[num_bytes][num_clusters][subvector_dim]`.
pub trait CodebookTrainer: Send + Sync + fmt::Debug {
    fn fit(&self, vectors: &[f32], shape: PqShape) -> Result<Vec<f32>, ModelError>;
}

/// Seeds every sub-space codebook with evenly strided training sub-vectors.
///
/// Deterministic and single-pass. With fewer vectors than clusters the vectors are cycled,
/// which yields duplicate centroids; ties then resolve to the lowest index.
#[derive(Debug, Default, Clone, Copy)]
pub struct StridedSampleTrainer;

impl CodebookTrainer for StridedSampleTrainer {
    fn fit(&self, vectors: &[f32], shape: PqShape) -> Result<Vec<f32>, ModelError> {
        shape.validate().map_err(|e| ModelError::InvalidShape {
            reason: e.to_string(),
        })?;

        let rows = vectors.len() / shape.dim;
        if rows == 0 {
            return Err(ModelError::TrainingFailed {
                reason: "no training vectors".to_string(),
            });
        }

        let sub = shape.subvector_dim();
        let mut centroids = Vec::with_capacity(shape.codebook_len());

        for m in 0..shape.num_bytes {
            for k in 0..shape.num_clusters {
                let row = if rows >= shape.num_clusters {
                    k * rows / shape.num_clusters
                } else {
                    k % rows
                };
                let start = row * shape.dim + m * sub;
                centroids.extend_from_slice(&vectors[start..start + sub]);
            }
        }

        Ok(centroids)
    }
}
