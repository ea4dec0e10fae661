//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants (e.g. code widths) from primary ones to avoid drift.
//!
//! # Code Invariants
//!
//! Codes travel as `u8` and are 1-based (`0` is reserved as a sentinel by downstream stages),
//! so a codebook can hold at most [`MAX_NUM_CLUSTERS`] centroids. Use [`PqShape`] to validate a
//! quantizer layout before building one, and [`validate_vector_dim`] at module boundaries.

/// Default number of rows handed to the numeric backend per call.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Offset added to the 0-based centroid index to form the wire code.
pub const CODE_OFFSET: u8 = 1;

/// Largest codebook that fits a 1-based `u8` code.
pub const MAX_NUM_CLUSTERS: usize = (u8::MAX - CODE_OFFSET) as usize + 1;

/// Default number of sub-vectors (code length in bytes).
pub const DEFAULT_NUM_BYTES: usize = 8;

/// Default codebook size per sub-vector.
pub const DEFAULT_NUM_CLUSTERS: usize = MAX_NUM_CLUSTERS;

/// Default vectorizer output dimension.
pub const DEFAULT_VECTOR_DIM: usize = 64;

/// Default outbound send timeout in milliseconds.
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000;

/// Largest wire frame accepted by the transport.
pub const MAX_FRAME_BYTES: usize = 256 * 1024 * 1024;

/// Product-quantizer layout: vector dimension split into `num_bytes` sub-vectors,
/// each quantized against `num_clusters` centroids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PqShape {
    /// Input vector dimension.
    pub dim: usize,
    /// Sub-vectors per vector.
    pub num_bytes: usize,
    /// Centroids per sub-vector.
    pub num_clusters: usize,
}

impl Default for PqShape {
    fn default() -> Self {
        Self {
            dim: DEFAULT_VECTOR_DIM,
            num_bytes: DEFAULT_NUM_BYTES,
            num_clusters: DEFAULT_NUM_CLUSTERS,
        }
    }
}

impl PqShape {
    /// Creates a new layout.
    pub fn new(dim: usize, num_bytes: usize, num_clusters: usize) -> Self {
        Self {
            dim,
            num_bytes,
            num_clusters,
        }
    }

    /// Validates that the layout is internally consistent.
    ///
    /// Returns an error if:
    /// - any field is zero
    /// - `dim` is not divisible by `num_bytes`
    /// - `num_clusters` exceeds [`MAX_NUM_CLUSTERS`]
    pub fn validate(&self) -> Result<(), ShapeValidationError> {
        if self.dim == 0 || self.num_bytes == 0 {
            return Err(ShapeValidationError::ZeroDimension);
        }
        if self.num_clusters == 0 {
            return Err(ShapeValidationError::EmptyCodebook);
        }
        if !self.dim.is_multiple_of(self.num_bytes) {
            return Err(ShapeValidationError::NotDivisible {
                dim: self.dim,
                num_bytes: self.num_bytes,
            });
        }
        if self.num_clusters > MAX_NUM_CLUSTERS {
            return Err(ShapeValidationError::TooManyClusters {
                num_clusters: self.num_clusters,
            });
        }
        Ok(())
    }

    /// Dimension of each sub-vector.
    pub fn subvector_dim(&self) -> usize {
        self.dim / self.num_bytes
    }

    /// Number of `f32` values in the full codebook.
    pub fn codebook_len(&self) -> usize {
        self.num_bytes * self.num_clusters * self.subvector_dim()
    }
}

/// Error returned when layout validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeValidationError {
    /// Vector dimension or sub-vector count is zero.
    ZeroDimension,
    /// A codebook needs at least one centroid.
    EmptyCodebook,
    /// Vector dimension must split evenly into sub-vectors.
    NotDivisible { dim: usize, num_bytes: usize },
    /// Codes would not fit a 1-based `u8`.
    TooManyClusters { num_clusters: usize },
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for ShapeValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "vector dimension and num_bytes must be non-zero"),
            Self::EmptyCodebook => write!(f, "num_clusters must be at least 1"),
            Self::NotDivisible { dim, num_bytes } => {
                write!(
                    f,
                    "vector dimension {} is not divisible by num_bytes {}",
                    dim, num_bytes
                )
            }
            Self::TooManyClusters { num_clusters } => {
                write!(
                    f,
                    "num_clusters {} exceeds the u8 code limit of {}",
                    num_clusters, MAX_NUM_CLUSTERS
                )
            }
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for ShapeValidationError {}

/// Validates that a runtime vector dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use quantstage::constants::{validate_vector_dim, DEFAULT_VECTOR_DIM};
///
/// validate_vector_dim(64, DEFAULT_VECTOR_DIM).unwrap();
/// ```
pub fn validate_vector_dim(actual: usize, expected: usize) -> Result<(), ShapeValidationError> {
    if actual != expected {
        return Err(ShapeValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
