//! Checkpointer trait and CheckpointError.
//!
//! Append-only log of checkpoints per run id. Implementations: `MemorySaver`
//! (in-process, not durable) and `SqliteSaver` (durable, feature `sqlite`).

use async_trait::async_trait;

use crate::memory::checkpoint::Checkpoint;

/// Error type for checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
    /// Write would not extend the run's history (seq not above the latest stored seq).
    #[error("run `{run_id}`: checkpoint {seq} does not follow stored checkpoint {latest}")]
    Conflict { run_id: String, seq: u64, latest: u64 },
}

impl From<serde_json::Error> for CheckpointError {
    fn from(e: serde_json::Error) -> Self {
        CheckpointError::Serialization(e.to_string())
    }
}

/// Saves and loads checkpoints keyed by `(run_id, seq)`.
///
/// Writes under distinct run ids are independent and may happen concurrently.
///
/// **Interaction**: Injected via `StateGraph::compile_with_checkpointer`;
/// `CompiledStateGraph` writes after every step and reads on `resume`.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Appends a checkpoint. Fails with `Conflict` unless `checkpoint.seq` is greater
    /// than every seq already stored for the run.
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Latest checkpoint of the run, if it has any.
    async fn get_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Whole history of the run, ordered by seq.
    async fn list(&self, run_id: &str) -> Result<Vec<Checkpoint>, CheckpointError>;
}

/// Shared append-only rule for implementations.
pub(crate) fn ensure_appends(
    run_id: &str,
    seq: u64,
    latest: Option<u64>,
) -> Result<(), CheckpointError> {
    match latest {
        Some(latest) if seq <= latest => Err(CheckpointError::Conflict {
            run_id: run_id.to_string(),
            seq,
            latest,
        }),
        _ => Ok(()),
    }
}
