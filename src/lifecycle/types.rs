#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointOutcome {
    Saved { bytes: u64, generation: u64 },
    /// Latest change is already on disk (or nothing was trained yet).
    Clean,
    Skipped { reason: String },
}
