use candle_core::{DType, Device, Tensor};
use tracing::debug;

use crate::model::backend::NearestCentroid;
use crate::model::backend::device::select_device;
use crate::model::error::ModelError;
use crate::model::quantizer::QuantizerState;
use crate::model::spec::BackendKind;

/// Batched distance computation with candle tensors.
///
/// Distances use `||x||² + ||c||² - 2·x·c` per sub-space, followed by an argmin over clusters.
pub struct TensorBackend {
    device: Device,
    codebook: Option<DeviceCodebook>,
}

struct DeviceCodebook {
    num_bytes: usize,
    subvector_dim: usize,
    /// `[M, d, K]`
    centroids_t: Tensor,
    /// `[M, 1, K]`
    norms: Tensor,
}

impl std::fmt::Debug for TensorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorBackend")
            .field("device", &self.device)
            .field("prepared", &self.codebook.is_some())
            .finish()
    }
}

impl TensorBackend {
    pub fn new() -> Self {
        Self::with_device(select_device())
    }

    pub fn with_device(device: Device) -> Self {
        Self {
            device,
            codebook: None,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl Default for TensorBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NearestCentroid for TensorBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Tensor
    }

    fn prepare(&mut self, state: &QuantizerState) -> Result<(), ModelError> {
        let [_, m, k, d] = state.centroid_shape();
        let centroids = Tensor::from_slice(&state.centroids, (m, k, d), &self.device)?;
        let norms = centroids.sqr()?.sum_keepdim(2)?.transpose(1, 2)?.contiguous()?;
        let centroids_t = centroids.transpose(1, 2)?.contiguous()?;

        // Replacing drops the previous device buffers.
        self.codebook = Some(DeviceCodebook {
            num_bytes: m,
            subvector_dim: d,
            centroids_t,
            norms,
        });
        debug!(num_bytes = m, num_clusters = k, subvector_dim = d, "Uploaded codebook");
        Ok(())
    }

    fn assign(&self, vectors: &[f32], rows: usize) -> Result<Vec<u32>, ModelError> {
        let book = self.codebook.as_ref().ok_or(ModelError::NotTrained)?;
        if rows == 0 {
            return Ok(Vec::new());
        }
        let dim = book.num_bytes * book.subvector_dim;
        if vectors.len() != rows * dim {
            return Err(ModelError::InvalidShape {
                reason: format!("expected {} values for {} rows, got {}", rows * dim, rows, vectors.len()),
            });
        }

        // [N, M, d] -> [M, N, d]
        let x = Tensor::from_slice(vectors, (rows, book.num_bytes, book.subvector_dim), &self.device)?
            .transpose(0, 1)?
            .contiguous()?;
        let x_norms = x.sqr()?.sum_keepdim(2)?;
        let dot = x.matmul(&book.centroids_t)?;
        let dist = x_norms
            .broadcast_add(&book.norms)?
            .broadcast_sub(&dot.affine(2.0, 0.0)?)?;

        // [M, N] -> [N, M]
        let nearest = dist
            .argmin(2)?
            .t()?
            .contiguous()?
            .to_dtype(DType::U32)?
            .flatten_all()?
            .to_vec1::<u32>()?;
        Ok(nearest)
    }

    fn release(&mut self) {
        if self.codebook.take().is_some() {
            debug!(device = ?self.device, "Released device codebook");
        }
    }
}

impl Drop for TensorBackend {
    fn drop(&mut self) {
        self.release();
    }
}
