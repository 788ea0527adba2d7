//! Serializer for checkpointed state (state <-> bytes).
//!
//! Used by persistent checkpointers. `MemorySaver` keeps `Checkpoint` values as they
//! are and does not need one.

use crate::memory::checkpointer::CheckpointError;
use crate::state::State;

/// Serializes and deserializes state snapshots for checkpoint storage.
pub trait Serializer: Send + Sync {
    fn serialize(&self, state: &State) -> Result<Vec<u8>, CheckpointError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<State, CheckpointError>;
}

/// JSON serializer (a state is a JSON object of its present fields).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, state: &State) -> Result<Vec<u8>, CheckpointError> {
        Ok(serde_json::to_vec(state)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<State, CheckpointError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
