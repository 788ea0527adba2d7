//! Checkpoint storage: checkpoint types, the `Checkpointer` trait and its savers.
//!
//! Aligns with LangGraph checkpointers: `MemorySaver` for in-process use (not
//! durable) and `SqliteSaver` (feature `sqlite`) when a run must be resumable after
//! a restart.

mod checkpoint;
mod checkpointer;
mod memory_saver;
mod serializer;

#[cfg(feature = "sqlite")]
mod sqlite_saver;

pub use checkpoint::{Checkpoint, CheckpointMetadata, CheckpointSource};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use memory_saver::MemorySaver;
pub use serializer::{JsonSerializer, Serializer};

#[cfg(feature = "sqlite")]
pub use sqlite_saver::SqliteSaver;
