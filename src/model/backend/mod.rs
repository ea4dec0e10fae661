//! Nearest-centroid backends.
//!
//! Both variants return 0-based centroid indices in row-major `[rows, num_bytes]` order and
//! resolve exact distance ties to the lowest index.

pub mod cpu;
pub mod device;
pub mod tensor;

use std::fmt;

pub use cpu::CpuBackend;
pub use device::select_device;
pub use tensor::TensorBackend;

use crate::model::error::ModelError;
use crate::model::quantizer::QuantizerState;
use crate::model::spec::BackendKind;

pub trait NearestCentroid: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    /// Binds the backend to a trained codebook, replacing any previous one.
    fn prepare(&mut self, state: &QuantizerState) -> Result<(), ModelError>;

    /// Nearest centroid per sub-vector for `rows` vectors.
    fn assign(&self, vectors: &[f32], rows: usize) -> Result<Vec<u32>, ModelError>;

    /// Frees codebook resources. Safe to call repeatedly.
    fn release(&mut self);
}

/// Creates an unprepared backend of the requested kind.
pub fn build_backend(kind: BackendKind) -> Box<dyn NearestCentroid> {
    match kind {
        BackendKind::Cpu => Box::new(CpuBackend::new()),
        BackendKind::Tensor => Box::new(TensorBackend::new()),
    }
}
