use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BATCH_SIZE, PqShape};
use crate::model::error::ModelError;

/// Numeric backend used for nearest-centroid assignment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Scalar reference implementation.
    #[default]
    Cpu,
    /// candle tensors (CUDA / Metal when compiled in, CPU otherwise).
    #[serde(alias = "candle", alias = "gpu")]
    Tensor,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "tensor" | "candle" | "gpu" => Ok(Self::Tensor),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

/// How raw chunks become vectors.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VectorizerSpec {
    /// Signed feature hashing of tokens (text) or 4-byte windows (blobs).
    Hashing { dim: u32 },
    /// Chunks already are vectors: little-endian f32 blobs, or whitespace/comma separated text.
    RawF32 { dim: u32 },
}

impl VectorizerSpec {
    pub fn dim(&self) -> usize {
        match *self {
            VectorizerSpec::Hashing { dim } | VectorizerSpec::RawF32 { dim } => dim as usize,
        }
    }
}

/// Declarative description of an untrained encoder.
///
/// ```
/// use quantstage::model::{BackendKind, ModelSpec};
///
/// let spec = ModelSpec::from_json(
///     r#"{"vectorizer": {"kind": "hashing", "dim": 16}, "num_bytes": 4, "num_clusters": 16}"#,
/// )
/// .unwrap();
/// assert_eq!(spec.backend, BackendKind::Cpu);
/// assert_eq!(spec.shape().subvector_dim(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSpec {
    pub vectorizer: VectorizerSpec,
    /// Sub-vectors per vector (code length).
    pub num_bytes: usize,
    /// Centroids per sub-vector.
    pub num_clusters: usize,
    #[serde(default)]
    pub backend: BackendKind,
    /// Max rows per backend call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl ModelSpec {
    /// Reads a JSON spec file; a missing file is [`ModelError::NotFound`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ModelError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ModelError> {
        let spec: Self = serde_json::from_str(content).map_err(|e| ModelError::InvalidSpec {
            reason: format!("Failed to parse model spec: {}", e),
        })?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn shape(&self) -> PqShape {
        PqShape::new(self.vectorizer.dim(), self.num_bytes, self.num_clusters)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.shape()
            .validate()
            .map_err(|e| ModelError::InvalidSpec {
                reason: e.to_string(),
            })?;

        if self.batch_size == 0 {
            return Err(ModelError::InvalidSpec {
                reason: "batch_size must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
