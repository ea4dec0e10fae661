use thiserror::Error;

use super::blob::ElementType;

/// Errors raised while interpreting or (de)serializing wire messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// Raw mode value outside TRAIN/INDEX/QUERY.
    #[error("unknown message mode {value}")]
    UnknownMode { value: i32 },

    /// Raw document type outside TEXT/IMAGE.
    #[error("unknown document type {value}")]
    UnknownDocType { value: i32 },

    /// Blob element type does not match what the reader expects.
    #[error("unexpected blob dtype: expected {expected:?}, got {actual:?}")]
    UnexpectedDtype {
        expected: ElementType,
        actual: ElementType,
    },

    /// Blob shape and payload length disagree.
    #[error("blob shape {shape:?} does not match {bytes} payload bytes")]
    ShapeMismatch { shape: Vec<u64>, bytes: usize },

    /// rkyv serialization failed.
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// rkyv validation or deserialization failed.
    #[error("failed to decode message: {0}")]
    Decode(String),

    /// Frame header announced more bytes than allowed.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },
}
