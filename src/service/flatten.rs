//! Message ⇄ chunk-list conversion.
//!
//! Chunks are concatenated in document order, then chunk order. Code rows are split back with
//! the same per-document sizes, so the mapping is length and order preserving.

use crate::model::{ChunkRef, CodeMatrix};
use crate::service::error::{ServiceError, ServiceResult};
use crate::wire::{DocType, Message};

/// Flattened view over a message's chunks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatBatch<'a> {
    pub chunks: Vec<ChunkRef<'a>>,
    /// Chunk count per document.
    pub sizes: Vec<usize>,
}

impl FlatBatch<'_> {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Selects each document's chunk list for `doc_type` and concatenates them.
///
/// A document whose declared `doc_size` differs from its chunk count fails the whole message.
pub fn flatten(msg: &Message, doc_type: DocType) -> ServiceResult<FlatBatch<'_>> {
    let mut batch = FlatBatch {
        chunks: Vec::with_capacity(msg.declared_chunks()),
        sizes: Vec::with_capacity(msg.docs.len()),
    };

    for (position, doc) in msg.docs.iter().enumerate() {
        let before = batch.chunks.len();
        match doc_type {
            DocType::Text => batch
                .chunks
                .extend(doc.text_chunks.iter().map(|c| ChunkRef::Text(c.as_str()))),
            DocType::Image => batch
                .chunks
                .extend(doc.blob_chunks.iter().map(|c| ChunkRef::Blob(c.as_slice()))),
        }
        let count = batch.chunks.len() - before;

        if count != doc.doc_size as usize {
            return Err(ServiceError::Validation {
                reason: format!(
                    "document {} (id {}) declares {} chunks but carries {}",
                    position, doc.doc_id, doc.doc_size, count
                ),
            });
        }
        batch.sizes.push(count);
    }

    Ok(batch)
}

/// Splits code rows into consecutive per-document blocks.
pub fn split_rows(codes: &CodeMatrix, sizes: &[usize]) -> ServiceResult<Vec<CodeMatrix>> {
    let total: usize = sizes.iter().sum();
    if codes.rows() != total {
        return Err(ServiceError::Validation {
            reason: format!(
                "encoder produced {} rows for {} chunks",
                codes.rows(),
                total
            ),
        });
    }

    let mut start = 0;
    let mut parts = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let part = codes
            .slice_rows(start..start + size)
            .ok_or_else(|| ServiceError::Validation {
                reason: format!("rows {}..{} out of bounds", start, start + size),
            })?;
        parts.push(part);
        start += size;
    }
    Ok(parts)
}
