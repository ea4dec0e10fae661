//! Tagged numeric arrays carried in [`Document::encodes`](super::Document::encodes).

use rkyv::{Archive, Deserialize, Serialize};

use super::error::WireError;
use crate::model::CodeMatrix;

/// Element type tag of an [`ArrayBlob`].
#[derive(Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    U8,
    U16,
    U32,
    F32,
}

impl ElementType {
    /// Width of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::U16 => 2,
            ElementType::U32 | ElementType::F32 => 4,
        }
    }
}

/// Row-major array serialized as shape + dtype + raw little-endian bytes.
///
/// # Example
/// ```rust
/// use quantstage::model::CodeMatrix;
/// use quantstage::wire::ArrayBlob;
///
/// let codes = CodeMatrix::new(2, vec![1, 2, 3, 4]).unwrap();
/// let blob = ArrayBlob::from_codes(&codes);
/// assert_eq!(blob.shape, vec![2, 2]);
/// assert_eq!(blob.to_codes().unwrap(), codes);
/// ```
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ArrayBlob {
    /// Dimensions, outermost first.
    pub shape: Vec<u64>,
    /// Element type of `data`.
    pub dtype: ElementType,
    /// Raw element bytes.
    pub data: Vec<u8>,
}

impl ArrayBlob {
    /// Encodes a code matrix as a `[rows, cols]` u8 blob.
    pub fn from_codes(codes: &CodeMatrix) -> Self {
        Self {
            shape: vec![codes.rows() as u64, codes.cols() as u64],
            dtype: ElementType::U8,
            data: codes.as_slice().to_vec(),
        }
    }

    /// Decodes a `[rows, cols]` u8 blob back into a code matrix.
    pub fn to_codes(&self) -> Result<CodeMatrix, WireError> {
        if self.dtype != ElementType::U8 {
            return Err(WireError::UnexpectedDtype {
                expected: ElementType::U8,
                actual: self.dtype,
            });
        }

        let [rows, cols] = self.shape[..] else {
            return Err(self.shape_mismatch());
        };
        if rows.checked_mul(cols) != Some(self.data.len() as u64) {
            return Err(self.shape_mismatch());
        }

        CodeMatrix::new(cols as usize, self.data.clone()).map_err(|_| self.shape_mismatch())
    }

    /// Leading dimension (row count), `0` for a scalar-shaped blob.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0) as usize
    }

    /// Number of elements implied by the shape.
    pub fn element_count(&self) -> usize {
        self.shape
            .iter()
            .fold(1u64, |acc, &dim| acc.saturating_mul(dim)) as usize
    }

    /// Returns `true` if the payload length matches shape and dtype.
    pub fn is_consistent(&self) -> bool {
        self.element_count().checked_mul(self.dtype.size()) == Some(self.data.len())
    }

    fn shape_mismatch(&self) -> WireError {
        WireError::ShapeMismatch {
            shape: self.shape.clone(),
            bytes: self.data.len(),
        }
    }
}
