//! On-disk encoder snapshots.
//!
//! A snapshot is a single rkyv archive. Writes go to a temporary file in the target directory
//! and are renamed into place, so readers never observe a partial dump. Reads memory-map the
//! file; mappings are page aligned, which satisfies rkyv's alignment requirement.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;
use rkyv::rancor::Error as RkyvError;
use rkyv::{Archive, Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::model::error::ModelError;
use crate::model::quantizer::QuantizerState;
use crate::model::spec::{BackendKind, ModelSpec, VectorizerSpec};

/// Bumped whenever the archived layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Everything needed to rebuild an encoder. Backend resources are never part of it.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EncoderSnapshot {
    pub format_version: u32,
    pub vectorizer: VectorizerSpec,
    pub backend: BackendKind,
    pub batch_size: u64,
    pub quantizer: QuantizerState,
}

impl EncoderSnapshot {
    pub fn new(spec: &ModelSpec, quantizer: QuantizerState) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            vectorizer: spec.vectorizer,
            backend: spec.backend,
            batch_size: spec.batch_size as u64,
            quantizer,
        }
    }

    /// Rebuilds the declarative spec this snapshot was created from.
    pub fn spec(&self) -> ModelSpec {
        ModelSpec {
            vectorizer: self.vectorizer,
            num_bytes: self.quantizer.num_bytes as usize,
            num_clusters: self.quantizer.num_clusters as usize,
            backend: self.backend,
            batch_size: self.batch_size as usize,
        }
    }
}

/// Atomically writes `snapshot` to `path`, returning the number of bytes written.
pub fn write_snapshot(path: &Path, snapshot: &EncoderSnapshot) -> Result<usize, ModelError> {
    let bytes = rkyv::to_bytes::<RkyvError>(snapshot).map_err(|e| ModelError::SaveFailed {
        reason: format!("serialization failed: {}", e),
    })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| save_failed(path, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| save_failed(path, e))?;
    tmp.write_all(&bytes).map_err(|e| save_failed(path, e))?;
    tmp.as_file().sync_all().map_err(|e| save_failed(path, e))?;
    tmp.persist(path).map_err(|e| save_failed(path, e.error))?;

    info!(path = %path.display(), bytes = bytes.len(), "Saved encoder snapshot");
    Ok(bytes.len())
}

/// Reads a snapshot; a missing file is [`ModelError::NotFound`].
pub fn read_snapshot(path: &Path) -> Result<EncoderSnapshot, ModelError> {
    if !path.is_file() {
        return Err(ModelError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(ModelError::LoadFailed {
            reason: format!("{} is empty", path.display()),
        });
    }

    // SAFETY: the file is only replaced by rename, never modified in place.
    let mmap = unsafe { Mmap::map(&file)? };
    let snapshot =
        rkyv::from_bytes::<EncoderSnapshot, RkyvError>(&mmap).map_err(|e| ModelError::LoadFailed {
            reason: format!("corrupt snapshot {}: {}", path.display(), e),
        })?;

    if snapshot.format_version != FORMAT_VERSION {
        return Err(ModelError::LoadFailed {
            reason: format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.format_version, FORMAT_VERSION
            ),
        });
    }

    debug!(path = %path.display(), bytes = mmap.len(), "Read encoder snapshot");
    Ok(snapshot)
}

fn save_failed(path: &Path, err: std::io::Error) -> ModelError {
    ModelError::SaveFailed {
        reason: format!("{}: {}", path.display(), err),
    }
}
