//! quantstage library crate (used by the binary and integration tests).
//!
//! A product-quantization encoder stage for a message-driven indexing pipeline: messages
//! arrive over a push/pull transport, their chunks are flattened, vectorized and quantized
//! into 1-based `u8` codes, and the codes are re-attached per document and forwarded.
//!
//! ## Modules
//! - [`wire`] - [`Message`], [`Document`] and the [`ArrayBlob`] code encoding
//! - [`model`] - [`PipelineEncoder`], the quantizer and its CPU / candle backends
//! - [`service`] - [`EncoderService`]: startup, mode dispatch and forwarding
//! - [`transport`] - TCP push/pull sockets and in-process channels
//! - [`lifecycle`] - [`CheckpointManager`] persisting models after training
//! - [`config`] - `QUANTSTAGE_*` environment configuration
//!
//! ## Test/Mock Support
//! [`transport::MockSink`] is available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod lifecycle;
pub mod model;
pub mod service;
pub mod transport;
pub mod wire;

pub use config::{Config, ConfigError};
pub use constants::{
    CODE_OFFSET, DEFAULT_BATCH_SIZE, MAX_NUM_CLUSTERS, PqShape, ShapeValidationError,
    validate_vector_dim,
};
pub use lifecycle::{CheckpointConfig, CheckpointError, CheckpointManager, CheckpointOutcome};
pub use model::{
    BackendKind, CodeMatrix, ModelError, ModelSpec, PipelineEncoder, VectorizerSpec,
};
pub use service::{EncoderService, ModelChanged, Outcome, ServiceConfig, ServiceError};
pub use transport::{MessageSink, MessageSource, TransportError};
pub use wire::{ArrayBlob, DocType, Document, Message, Mode, Query, WireError};
