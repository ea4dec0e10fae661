use tracing::debug;

use crate::model::backend::NearestCentroid;
use crate::model::error::ModelError;
use crate::model::quantizer::QuantizerState;
use crate::model::spec::BackendKind;

/// Scalar nearest-centroid search over a host-side codebook copy.
#[derive(Debug, Default)]
pub struct CpuBackend {
    codebook: Option<CpuCodebook>,
}

#[derive(Debug)]
struct CpuCodebook {
    num_bytes: usize,
    num_clusters: usize,
    subvector_dim: usize,
    centroids: Vec<f32>,
    /// `||c||²` per `[m][k]`.
    norms: Vec<f32>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NearestCentroid for CpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn prepare(&mut self, state: &QuantizerState) -> Result<(), ModelError> {
        let subvector_dim = state.subvector_dim as usize;
        if subvector_dim == 0 {
            return Err(ModelError::BackendFailed {
                reason: "sub-vector dimension is zero".to_string(),
            });
        }
        let norms = state
            .centroids
            .chunks_exact(subvector_dim)
            .map(|c| c.iter().map(|v| v * v).sum())
            .collect();

        self.codebook = Some(CpuCodebook {
            num_bytes: state.num_bytes as usize,
            num_clusters: state.num_clusters as usize,
            subvector_dim,
            centroids: state.centroids.clone(),
            norms,
        });
        Ok(())
    }

    fn assign(&self, vectors: &[f32], rows: usize) -> Result<Vec<u32>, ModelError> {
        let book = self.codebook.as_ref().ok_or(ModelError::NotTrained)?;
        let dim = book.num_bytes * book.subvector_dim;
        if vectors.len() != rows * dim {
            return Err(ModelError::InvalidShape {
                reason: format!("expected {} values for {} rows, got {}", rows * dim, rows, vectors.len()),
            });
        }

        let mut out = Vec::with_capacity(rows * book.num_bytes);
        for row in vectors.chunks_exact(dim) {
            for (m, x) in row.chunks_exact(book.subvector_dim).enumerate() {
                let x_norm: f32 = x.iter().map(|v| v * v).sum();
                let mut best = 0usize;
                let mut best_dist = f32::INFINITY;
                for k in 0..book.num_clusters {
                    let slot = m * book.num_clusters + k;
                    let c = &book.centroids[slot * book.subvector_dim..(slot + 1) * book.subvector_dim];
                    let dot: f32 = x.iter().zip(c).map(|(a, b)| a * b).sum();
                    let dist = x_norm + book.norms[slot] - 2.0 * dot;
                    // strict: ties keep the lower index
                    if dist < best_dist {
                        best_dist = dist;
                        best = k;
                    }
                }
                out.push(best as u32);
            }
        }
        Ok(out)
    }

    fn release(&mut self) {
        if self.codebook.take().is_some() {
            debug!("Released CPU codebook");
        }
    }
}
