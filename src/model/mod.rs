//! Trainable product-quantization encoder.
//!
//! [`PipelineEncoder`] is the unit the service owns: chunks are vectorized, split into bounded
//! batches and assigned to their nearest centroids by a [`NearestCentroid`] backend.

pub mod backend;
pub mod batching;
pub mod codes;
pub mod encoder;
pub mod error;
pub mod persist;
pub mod quantizer;
pub mod spec;
pub mod trainer;
pub mod vectorizer;

#[cfg(test)]
mod tests;

pub use backend::{CpuBackend, NearestCentroid, TensorBackend, build_backend, select_device};
pub use batching::Batcher;
pub use codes::CodeMatrix;
pub use encoder::PipelineEncoder;
pub use error::ModelError;
pub use persist::{EncoderSnapshot, FORMAT_VERSION, read_snapshot, write_snapshot};
pub use quantizer::{PqQuantizer, QuantizerState};
pub use spec::{BackendKind, ModelSpec, VectorizerSpec};
pub use trainer::{CodebookTrainer, StridedSampleTrainer};
pub use vectorizer::{ChunkRef, Vectorizer};
