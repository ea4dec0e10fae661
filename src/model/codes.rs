use std::ops::Range;

use crate::constants::ShapeValidationError;

/// Row-major `[rows, cols]` matrix of 1-based quantization codes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeMatrix {
    cols: usize,
    data: Vec<u8>,
}

impl CodeMatrix {
    /// Wraps row-major data; `data.len()` must be a multiple of `cols`.
    pub fn new(cols: usize, data: Vec<u8>) -> Result<Self, ShapeValidationError> {
        if cols == 0 {
            if !data.is_empty() {
                return Err(ShapeValidationError::ZeroDimension);
            }
        } else if !data.len().is_multiple_of(cols) {
            return Err(ShapeValidationError::NotDivisible {
                dim: data.len(),
                num_bytes: cols,
            });
        }
        Ok(Self { cols, data })
    }

    /// A `[0, cols]` matrix.
    pub fn empty(cols: usize) -> Self {
        Self {
            cols,
            data: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        if self.cols == 0 {
            0
        } else {
            self.data.len() / self.cols
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Returns row `index`, if present.
    pub fn row(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(self.cols)?;
        self.data.get(start..start + self.cols)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.cols.max(1))
    }

    /// Copies a contiguous row range into a new matrix.
    ///
    /// Returns `None` if the range is out of bounds.
    pub fn slice_rows(&self, rows: Range<usize>) -> Option<CodeMatrix> {
        if rows.start > rows.end || rows.end > self.rows() {
            return None;
        }
        let data = self.data[rows.start * self.cols..rows.end * self.cols].to_vec();
        Some(Self {
            cols: self.cols,
            data,
        })
    }

    /// Smallest and largest code, `None` when empty.
    pub fn code_range(&self) -> Option<(u8, u8)> {
        let min = self.data.iter().copied().min()?;
        let max = self.data.iter().copied().max()?;
        Some((min, max))
    }
}
