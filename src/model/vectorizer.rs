//! Chunk → vector conversion ahead of quantization.

use tracing::debug;

use crate::model::error::ModelError;
use crate::model::spec::VectorizerSpec;

/// Borrowed view of one flattened chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRef<'a> {
    Text(&'a str),
    Blob(&'a [u8]),
}

impl ChunkRef<'_> {
    pub fn len(&self) -> usize {
        match self {
            ChunkRef::Text(text) => text.len(),
            ChunkRef::Blob(blob) => blob.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

const BLOB_WINDOW: usize = 4;

/// Stateless vectorizer; produces row-major `[chunks, dim]` f32 data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vectorizer {
    spec: VectorizerSpec,
}

impl Vectorizer {
    pub fn new(spec: VectorizerSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> VectorizerSpec {
        self.spec
    }

    pub fn dim(&self) -> usize {
        self.spec.dim()
    }

    /// Vectorizes all chunks in order.
    pub fn vectorize(&self, chunks: &[ChunkRef<'_>]) -> Result<Vec<f32>, ModelError> {
        let dim = self.dim();
        if dim == 0 {
            return Err(ModelError::InvalidShape {
                reason: "vectorizer dimension is zero".to_string(),
            });
        }
        let mut out = vec![0.0f32; chunks.len() * dim];

        for (index, (chunk, row)) in chunks.iter().zip(out.chunks_exact_mut(dim)).enumerate() {
            match self.spec {
                VectorizerSpec::Hashing { .. } => hash_chunk(chunk, row),
                VectorizerSpec::RawF32 { .. } => parse_chunk(index, chunk, row)?,
            }
        }

        debug!(chunks = chunks.len(), dim, "Vectorized chunks");
        Ok(out)
    }
}

fn hash_chunk(chunk: &ChunkRef<'_>, row: &mut [f32]) {
    match chunk {
        ChunkRef::Text(text) => {
            for token in text.split_whitespace() {
                hash_token(token.to_lowercase().as_bytes(), row);
            }
        }
        ChunkRef::Blob(blob) => {
            for window in blob.chunks(BLOB_WINDOW) {
                hash_token(window, row);
            }
        }
    }
    normalize(row);
}

fn hash_token(token: &[u8], row: &mut [f32]) {
    let hash = blake3::hash(token);
    let bytes = hash.as_bytes();

    let mut bucket = [0u8; 8];
    bucket.copy_from_slice(&bytes[..8]);
    let index = (u64::from_le_bytes(bucket) % row.len() as u64) as usize;
    let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

    row[index] += sign;
}

fn normalize(row: &mut [f32]) {
    let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in row.iter_mut() {
            *x /= norm;
        }
    }
}

fn parse_chunk(index: usize, chunk: &ChunkRef<'_>, row: &mut [f32]) -> Result<(), ModelError> {
    let dim = row.len();
    match chunk {
        ChunkRef::Blob(blob) => {
            if blob.len() != dim * 4 {
                return Err(ModelError::InvalidChunk {
                    index,
                    reason: format!("expected {} bytes of f32 data, got {}", dim * 4, blob.len()),
                });
            }
            for (value, bytes) in row.iter_mut().zip(blob.chunks_exact(4)) {
                *value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
        }
        ChunkRef::Text(text) => {
            let mut count = 0usize;
            for token in text
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
            {
                let value: f32 = token.parse().map_err(|e| ModelError::InvalidChunk {
                    index,
                    reason: format!("'{}' is not a number: {}", token, e),
                })?;
                if let Some(slot) = row.get_mut(count) {
                    *slot = value;
                }
                count += 1;
            }
            if count != dim {
                return Err(ModelError::InvalidChunk {
                    index,
                    reason: format!("expected {} values, got {}", dim, count),
                });
            }
        }
    }

    if let Some(pos) = row.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::InvalidChunk {
            index,
            reason: format!("non-finite value at offset {}", pos),
        });
    }
    Ok(())
}
