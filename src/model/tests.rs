use std::sync::Arc;

use candle_core::Device;
use tempfile::TempDir;

use super::*;
use crate::constants::{CODE_OFFSET, DEFAULT_BATCH_SIZE, PqShape};

fn hashing_spec(backend: BackendKind) -> ModelSpec {
    ModelSpec {
        vectorizer: VectorizerSpec::Hashing { dim: 16 },
        num_bytes: 4,
        num_clusters: 16,
        backend,
        batch_size: DEFAULT_BATCH_SIZE,
    }
}

fn raw_spec(backend: BackendKind, batch_size: usize) -> ModelSpec {
    ModelSpec {
        vectorizer: VectorizerSpec::RawF32 { dim: 4 },
        num_bytes: 2,
        num_clusters: 4,
        backend,
        batch_size,
    }
}

fn corpus(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("chunk {} topic{} word{}", i, i % 5, i % 3))
        .collect()
}

fn text_refs(texts: &[String]) -> Vec<ChunkRef<'_>> {
    texts.iter().map(|t| ChunkRef::Text(t.as_str())).collect()
}

const GRID: [[f32; 2]; 4] = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]];

/// Training rows whose sub-vectors land exactly on the grid points.
fn grid_training() -> Vec<String> {
    (0..4)
        .map(|k| {
            let a = GRID[k];
            let b = GRID[3 - k];
            format!("{} {} {} {}", a[0], a[1], b[0], b[1])
        })
        .collect()
}

fn trained_raw(backend: BackendKind, batch_size: usize) -> PipelineEncoder {
    let mut encoder = PipelineEncoder::from_spec(raw_spec(backend, batch_size)).unwrap();
    let training = grid_training();
    encoder.train(&text_refs(&training)).unwrap();
    encoder
}

fn trained_state(centroids: Vec<f32>, num_clusters: u32, subvector_dim: u32) -> QuantizerState {
    QuantizerState {
        num_bytes: 1,
        num_clusters,
        subvector_dim,
        centroids,
        is_trained: true,
    }
}

// ---------------------------------------------------------------------------
// spec
// ---------------------------------------------------------------------------

#[test]
fn test_spec_from_json_defaults() {
    let spec = ModelSpec::from_json(
        r#"{"vectorizer": {"kind": "hashing", "dim": 64}, "num_bytes": 8, "num_clusters": 255}"#,
    )
    .unwrap();
    assert_eq!(spec.backend, BackendKind::Cpu);
    assert_eq!(spec.batch_size, DEFAULT_BATCH_SIZE);
    assert_eq!(spec.shape().subvector_dim(), 8);
}

#[test]
fn test_spec_backend_aliases() {
    let spec = ModelSpec::from_json(
        r#"{"vectorizer": {"kind": "raw_f32", "dim": 4}, "num_bytes": 2, "num_clusters": 4,
            "backend": "candle", "batch_size": 16}"#,
    )
    .unwrap();
    assert_eq!(spec.backend, BackendKind::Tensor);
    assert_eq!("gpu".parse::<BackendKind>().unwrap(), BackendKind::Tensor);
    assert_eq!("CPU".parse::<BackendKind>().unwrap(), BackendKind::Cpu);
    assert!("tpu".parse::<BackendKind>().is_err());
}

#[test]
fn test_spec_rejects_invalid_layouts() {
    let too_many = r#"{"vectorizer": {"kind": "hashing", "dim": 16}, "num_bytes": 4, "num_clusters": 256}"#;
    assert!(matches!(
        ModelSpec::from_json(too_many),
        Err(ModelError::InvalidSpec { .. })
    ));

    let indivisible = r#"{"vectorizer": {"kind": "hashing", "dim": 10}, "num_bytes": 4, "num_clusters": 8}"#;
    assert!(ModelSpec::from_json(indivisible).is_err());

    let zero_batch = r#"{"vectorizer": {"kind": "hashing", "dim": 16}, "num_bytes": 4, "num_clusters": 8, "batch_size": 0}"#;
    assert!(ModelSpec::from_json(zero_batch).is_err());

    let unknown_field = r#"{"vectorizer": {"kind": "hashing", "dim": 16}, "num_bytes": 4, "num_clusters": 8, "extra": 1}"#;
    assert!(ModelSpec::from_json(unknown_field).is_err());
}

#[test]
fn test_spec_from_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = ModelSpec::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ModelError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// codes
// ---------------------------------------------------------------------------

#[test]
fn test_code_matrix_shape_checks() {
    assert!(CodeMatrix::new(3, vec![1, 2, 3, 4]).is_err());
    assert!(CodeMatrix::new(0, vec![1]).is_err());
    assert_eq!(CodeMatrix::new(0, vec![]).unwrap().rows(), 0);

    let codes = CodeMatrix::new(2, vec![1, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(codes.rows(), 3);
    assert_eq!(codes.row(1), Some(&[3u8, 4][..]));
    assert_eq!(codes.row(3), None);
    assert_eq!(codes.iter_rows().count(), 3);
    assert_eq!(codes.code_range(), Some((1, 6)));
    assert_eq!(CodeMatrix::empty(2).code_range(), None);
}

#[test]
fn test_code_matrix_slice_rows() {
    let codes = CodeMatrix::new(2, vec![1, 2, 3, 4, 5, 6]).unwrap();
    let tail = codes.slice_rows(1..3).unwrap();
    assert_eq!(tail.as_slice(), &[3, 4, 5, 6]);
    assert_eq!(codes.slice_rows(2..2).unwrap().rows(), 0);
    assert!(codes.slice_rows(2..4).is_none());
}

// ---------------------------------------------------------------------------
// batching
// ---------------------------------------------------------------------------

#[test]
fn test_batcher_rejects_zero() {
    assert!(matches!(Batcher::new(0), Err(ModelError::InvalidSpec { .. })));
    assert_eq!(Batcher::default().batch_size(), DEFAULT_BATCH_SIZE);
}

#[test]
fn test_batcher_ranges_cover_rows() {
    let batcher = Batcher::new(3).unwrap();
    let ranges: Vec<_> = batcher.ranges(10).collect();
    assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);
    assert_eq!(batcher.num_batches(10), 4);
    assert_eq!(batcher.num_batches(9), 3);
    assert_eq!(batcher.num_batches(0), 0);
}

#[test]
fn test_batcher_run_matches_single_call() {
    let op = |range: std::ops::Range<usize>| -> Result<Vec<usize>, ()> {
        Ok(range.map(|i| i * i).collect())
    };
    let whole = Batcher::new(usize::MAX).unwrap().run(17, op).unwrap();
    for size in [1, 2, 5, 16, 17, 100] {
        assert_eq!(Batcher::new(size).unwrap().run(17, op).unwrap(), whole);
    }
}

#[test]
fn test_batcher_zero_rows_skips_op() {
    let mut calls = 0;
    let out: Vec<u8> = Batcher::new(4)
        .unwrap()
        .run(0, |_| -> Result<Vec<u8>, ()> {
            calls += 1;
            Ok(vec![1])
        })
        .unwrap();
    assert!(out.is_empty());
    assert_eq!(calls, 0);
}

#[test]
fn test_batcher_propagates_error() {
    let result = Batcher::new(2).unwrap().run(6, |range| {
        if range.start == 2 {
            Err("boom")
        } else {
            Ok(vec![range.start])
        }
    });
    assert_eq!(result, Err("boom"));
}

// ---------------------------------------------------------------------------
// vectorizer
// ---------------------------------------------------------------------------

#[test]
fn test_hashing_vectorizer_is_deterministic_and_normalized() {
    let vectorizer = Vectorizer::new(VectorizerSpec::Hashing { dim: 16 });
    let chunks = [ChunkRef::Text("Hello hello world"), ChunkRef::Blob(&[1, 2, 3, 4, 5, 6, 7, 8, 9])];
    let a = vectorizer.vectorize(&chunks).unwrap();
    let b = vectorizer.vectorize(&chunks).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 32);

    for row in a.chunks_exact(16) {
        let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}

#[test]
fn test_hashing_vectorizer_empty_chunk_is_zero() {
    let vectorizer = Vectorizer::new(VectorizerSpec::Hashing { dim: 8 });
    let out = vectorizer.vectorize(&[ChunkRef::Text("   ")]).unwrap();
    assert!(out.iter().all(|v| *v == 0.0));
}

#[test]
fn test_raw_vectorizer_parses_text_and_blobs() {
    let vectorizer = Vectorizer::new(VectorizerSpec::RawF32 { dim: 3 });
    let blob: Vec<u8> = [1.5f32, -2.0, 0.25]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let out = vectorizer
        .vectorize(&[ChunkRef::Text("1, 2 3"), ChunkRef::Blob(&blob)])
        .unwrap();
    assert_eq!(out, vec![1.0, 2.0, 3.0, 1.5, -2.0, 0.25]);
}

#[test]
fn test_raw_vectorizer_rejects_bad_chunks() {
    let vectorizer = Vectorizer::new(VectorizerSpec::RawF32 { dim: 3 });

    let err = vectorizer
        .vectorize(&[ChunkRef::Text("1 2 3"), ChunkRef::Text("1 2")])
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidChunk { index: 1, .. }));

    assert!(vectorizer.vectorize(&[ChunkRef::Text("1 x 3")]).is_err());
    assert!(vectorizer.vectorize(&[ChunkRef::Text("1 NaN 3")]).is_err());
    assert!(vectorizer.vectorize(&[ChunkRef::Blob(&[0; 11])]).is_err());
}

// ---------------------------------------------------------------------------
// trainer
// ---------------------------------------------------------------------------

#[test]
fn test_strided_trainer_picks_evenly_spaced_rows() {
    // 4 rows of dim 2, one sub-vector, 2 clusters: rows 0 and 2.
    let vectors = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5];
    let centroids = StridedSampleTrainer
        .fit(&vectors, PqShape::new(2, 1, 2))
        .unwrap();
    assert_eq!(centroids, vec![0.0, 0.5, 2.0, 2.5]);
}

#[test]
fn test_strided_trainer_cycles_short_input() {
    let vectors = [1.0, 2.0, 3.0, 4.0];
    let centroids = StridedSampleTrainer
        .fit(&vectors, PqShape::new(2, 2, 3))
        .unwrap();
    // sub-space 0 uses first halves, sub-space 1 second halves; rows cycle 0,1,0.
    assert_eq!(centroids, vec![1.0, 3.0, 1.0, 2.0, 4.0, 2.0]);
}

#[test]
fn test_strided_trainer_needs_rows() {
    let err = StridedSampleTrainer
        .fit(&[], PqShape::new(2, 1, 2))
        .unwrap_err();
    assert!(matches!(err, ModelError::TrainingFailed { .. }));
}

// ---------------------------------------------------------------------------
// quantizer + backends
// ---------------------------------------------------------------------------

fn backends() -> Vec<Box<dyn NearestCentroid>> {
    vec![
        Box::new(CpuBackend::new()),
        Box::new(TensorBackend::with_device(Device::Cpu)),
    ]
}

#[test]
fn test_quantizer_assigns_nearest_centroid() {
    let state = trained_state(vec![0.0, 0.0, 10.0, 0.0, 0.0, 10.0], 3, 2);
    let vectors = [9.0, 1.0, 0.0, 0.0, 1.0, 8.0];

    for backend in backends() {
        let quantizer = PqQuantizer::from_state(state.clone(), backend, Batcher::default()).unwrap();
        let codes = quantizer.encode(&vectors, 2).unwrap();
        assert_eq!(codes.as_slice(), &[2, 1, 3]);
        quantizer.close();
    }
}

#[test]
fn test_quantizer_ties_resolve_to_lowest_index() {
    let symmetric = trained_state(vec![1.0, 0.0, -1.0, 0.0], 2, 2);
    let duplicate = trained_state(vec![5.0, 5.0, 5.0, 5.0], 2, 2);

    for state in [symmetric, duplicate] {
        for backend in backends() {
            let quantizer =
                PqQuantizer::from_state(state.clone(), backend, Batcher::default()).unwrap();
            let codes = quantizer.encode(&[0.0, 0.0], 2).unwrap();
            assert_eq!(codes.as_slice(), &[CODE_OFFSET]);
        }
    }
}

#[test]
fn test_quantizer_untrained_gate() {
    let state = QuantizerState::untrained(PqShape::new(4, 2, 4));
    let quantizer =
        PqQuantizer::from_state(state, Box::new(CpuBackend::new()), Batcher::default()).unwrap();
    assert!(!quantizer.is_trained());
    assert!(matches!(
        quantizer.encode(&[0.0; 4], 4),
        Err(ModelError::NotTrained)
    ));
}

#[test]
fn test_quantizer_rejects_bad_shapes() {
    let state = trained_state(vec![0.0, 0.0, 1.0, 1.0], 2, 2);
    let quantizer =
        PqQuantizer::from_state(state, Box::new(CpuBackend::new()), Batcher::default()).unwrap();

    // dimension 3 does not match the sub-vector dimension 2
    assert!(matches!(
        quantizer.encode(&[0.0; 3], 3),
        Err(ModelError::InvalidShape { .. })
    ));
    // partial trailing row
    assert!(matches!(
        quantizer.encode(&[0.0; 5], 2),
        Err(ModelError::InvalidShape { .. })
    ));
    assert!(matches!(
        quantizer.encode(&[], 0),
        Err(ModelError::InvalidShape { .. })
    ));
}

#[test]
fn test_quantizer_empty_batch() {
    let state = trained_state(vec![0.0, 0.0, 1.0, 1.0], 2, 2);
    for backend in backends() {
        let quantizer = PqQuantizer::from_state(state.clone(), backend, Batcher::default()).unwrap();
        let codes = quantizer.encode(&[], 2).unwrap();
        assert_eq!(codes.rows(), 0);
        assert_eq!(codes.cols(), 1);
    }
}

#[test]
fn test_quantizer_state_validation() {
    let mut state = trained_state(vec![0.0; 3], 2, 2);
    assert!(matches!(state.validate(), Err(ModelError::InvalidSpec { .. })));
    state.centroids = vec![0.0; 4];
    assert!(state.validate().is_ok());
    assert_eq!(state.centroid_shape(), [1, 1, 2, 2]);
}

#[derive(Debug)]
struct ShortTrainer;

impl CodebookTrainer for ShortTrainer {
    fn fit(&self, _vectors: &[f32], _shape: PqShape) -> Result<Vec<f32>, ModelError> {
        Ok(vec![0.0])
    }
}

#[test]
fn test_failed_training_keeps_previous_state() {
    let mut encoder = PipelineEncoder::from_spec(raw_spec(BackendKind::Cpu, 8))
        .unwrap()
        .with_trainer(Arc::new(ShortTrainer));
    let training = grid_training();

    let err = encoder.train(&text_refs(&training)).unwrap_err();
    assert!(matches!(err, ModelError::TrainingFailed { .. }));
    assert!(!encoder.is_trained());

    assert!(matches!(
        encoder.train(&[]),
        Err(ModelError::TrainingFailed { .. })
    ));
}

// ---------------------------------------------------------------------------
// encoder
// ---------------------------------------------------------------------------

#[test]
fn test_encoder_untrained_gate() {
    let encoder = PipelineEncoder::from_spec(hashing_spec(BackendKind::Cpu)).unwrap();
    assert!(!encoder.is_trained());
    assert!(matches!(encoder.encode(&[]), Err(ModelError::NotTrained)));
    assert!(matches!(
        encoder.encode(&[ChunkRef::Text("a")]),
        Err(ModelError::NotTrained)
    ));
}

#[test]
fn test_encoder_codes_within_range() {
    let texts = corpus(40);
    let chunks = text_refs(&texts);
    let mut encoder = PipelineEncoder::from_spec(hashing_spec(BackendKind::Cpu)).unwrap();
    encoder.train(&chunks).unwrap();

    let codes = encoder.encode(&chunks).unwrap();
    assert_eq!(codes.rows(), 40);
    assert_eq!(codes.cols(), 4);
    let (min, max) = codes.code_range().unwrap();
    assert!(min >= 1);
    assert!(max as usize <= encoder.num_clusters());
}

#[test]
fn test_encoder_grid_codes() {
    let encoder = trained_raw(BackendKind::Cpu, 8);
    let chunks = [
        ChunkRef::Text("0.5 0.5 9.5 9.5"),
        ChunkRef::Text("9 1 1 9"),
        ChunkRef::Text("1 9 9 1"),
    ];
    let codes = encoder.encode(&chunks).unwrap();
    // sub-space 0 centroids are GRID[k]; sub-space 1 centroids are GRID[3 - k]
    assert_eq!(codes.as_slice(), &[1, 1, 2, 2, 3, 3]);
}

#[test]
fn test_cpu_and_tensor_backends_agree() {
    let cpu = trained_raw(BackendKind::Cpu, 8);
    let tensor = trained_raw(BackendKind::Tensor, 8);

    let texts: Vec<String> = (0..32)
        .map(|i| {
            let a = GRID[i % 4];
            let b = GRID[(i / 4) % 4];
            let jitter = (i % 7) as f32 * 0.3;
            format!("{} {} {} {}", a[0] + jitter, a[1] - jitter, b[0] - jitter, b[1] + jitter)
        })
        .collect();
    let chunks = text_refs(&texts);

    assert_eq!(cpu.encode(&chunks).unwrap(), tensor.encode(&chunks).unwrap());
    tensor.close();
}

#[test]
fn test_encoder_batching_is_transparent() {
    let texts = corpus(25);
    let chunks = text_refs(&texts);
    let mut reference = PipelineEncoder::from_spec(hashing_spec(BackendKind::Cpu)).unwrap();
    reference.train(&chunks).unwrap();
    let expected = reference.encode(&chunks).unwrap();

    for batch_size in [1, 2, 7, 25, 64] {
        let mut snapshot = reference.snapshot();
        snapshot.batch_size = batch_size;
        let encoder = PipelineEncoder::from_snapshot(&snapshot).unwrap();
        assert_eq!(encoder.encode(&chunks).unwrap(), expected, "batch_size {}", batch_size);
    }
}

#[test]
fn test_encoder_rejects_mismatched_snapshot() {
    let encoder = trained_raw(BackendKind::Cpu, 8);
    let mut snapshot = encoder.snapshot();
    snapshot.vectorizer = VectorizerSpec::RawF32 { dim: 8 };
    assert!(matches!(
        PipelineEncoder::from_snapshot(&snapshot),
        Err(ModelError::InvalidSpec { .. })
    ));
}

// ---------------------------------------------------------------------------
// persistence
// ---------------------------------------------------------------------------

#[test]
fn test_save_and_load_reproduce_codes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("encoder.rkyv");

    let texts = corpus(12);
    let chunks = text_refs(&texts);
    let mut encoder = PipelineEncoder::from_spec(hashing_spec(BackendKind::Cpu)).unwrap();
    encoder.train(&chunks).unwrap();
    let bytes = encoder.save(&path).unwrap();
    assert!(bytes > 0);

    let loaded = PipelineEncoder::load(&path).unwrap();
    assert!(loaded.is_trained());
    assert_eq!(loaded.snapshot(), encoder.snapshot());
    assert_eq!(loaded.encode(&chunks).unwrap(), encoder.encode(&chunks).unwrap());
}

#[test]
fn test_save_untrained_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("encoder.rkyv");

    let encoder = PipelineEncoder::from_spec(hashing_spec(BackendKind::Tensor)).unwrap();
    encoder.save(&path).unwrap();

    let loaded = PipelineEncoder::load(&path).unwrap();
    assert!(!loaded.is_trained());
    assert_eq!(loaded.spec(), encoder.spec());
}

#[test]
fn test_load_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = PipelineEncoder::load(dir.path().join("missing.rkyv")).unwrap_err();
    assert!(matches!(err, ModelError::NotFound { .. }));
}

#[test]
fn test_load_corrupt_or_empty_dump() {
    let dir = TempDir::new().unwrap();

    let empty = dir.path().join("empty.rkyv");
    std::fs::write(&empty, b"").unwrap();
    assert!(matches!(
        PipelineEncoder::load(&empty),
        Err(ModelError::LoadFailed { .. })
    ));

    let garbage = dir.path().join("garbage.rkyv");
    std::fs::write(&garbage, [0xAB; 64]).unwrap();
    assert!(matches!(
        PipelineEncoder::load(&garbage),
        Err(ModelError::LoadFailed { .. })
    ));
}

#[test]
fn test_load_rejects_future_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("encoder.rkyv");

    let encoder = PipelineEncoder::from_spec(hashing_spec(BackendKind::Cpu)).unwrap();
    let mut snapshot = encoder.snapshot();
    snapshot.format_version = FORMAT_VERSION + 1;
    write_snapshot(&path, &snapshot).unwrap();

    assert!(matches!(
        read_snapshot(&path),
        Err(ModelError::LoadFailed { .. })
    ));
}

#[test]
fn test_from_spec_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.json");
    std::fs::write(
        &path,
        r#"{"vectorizer": {"kind": "hashing", "dim": 16}, "num_bytes": 4, "num_clusters": 16}"#,
    )
    .unwrap();

    let encoder = PipelineEncoder::from_spec_file(&path).unwrap();
    assert_eq!(encoder.dim(), 16);
    assert_eq!(encoder.num_bytes(), 4);
    assert!(!encoder.is_trained());
}
