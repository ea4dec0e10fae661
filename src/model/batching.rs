//! Bounded sub-batching for backend calls.
//!
//! Splitting is invisible to callers: slices are contiguous, processed in order, and their
//! outputs are concatenated in the same order, so the result equals one call over all rows.

use std::ops::Range;

use crate::constants::DEFAULT_BATCH_SIZE;
use crate::model::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batcher {
    batch_size: usize,
}

impl Default for Batcher {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Batcher {
    pub fn new(batch_size: usize) -> Result<Self, ModelError> {
        if batch_size == 0 {
            return Err(ModelError::InvalidSpec {
                reason: "batch_size must be at least 1".to_string(),
            });
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// `ceil(rows / batch_size)`.
    pub fn num_batches(&self, rows: usize) -> usize {
        rows.div_ceil(self.batch_size)
    }

    /// Contiguous row ranges covering `0..rows`.
    pub fn ranges(&self, rows: usize) -> impl Iterator<Item = Range<usize>> {
        let batch_size = self.batch_size;
        (0..rows)
            .step_by(batch_size)
            .map(move |start| start..start.saturating_add(batch_size).min(rows))
    }

    /// Runs `op` once per range and concatenates the outputs.
    ///
    /// `rows == 0` returns an empty vector without calling `op`.
    pub fn run<T, E, F>(&self, rows: usize, mut op: F) -> Result<Vec<T>, E>
    where
        F: FnMut(Range<usize>) -> Result<Vec<T>, E>,
    {
        let mut out = Vec::new();
        for range in self.ranges(rows) {
            out.extend(op(range)?);
        }
        Ok(out)
    }
}
