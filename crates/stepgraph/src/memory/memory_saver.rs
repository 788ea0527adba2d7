//! In-memory checkpointer. Aligns with LangGraph MemorySaver.
//!
//! Not durable: history lives only as long as the saver. Use `SqliteSaver` when a
//! run must survive a process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::memory::checkpoint::Checkpoint;
use crate::memory::checkpointer::{ensure_appends, CheckpointError, Checkpointer};

/// In-process checkpointer: run id → ordered checkpoints.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer>` in `StateGraph::compile_with_checkpointer`.
#[derive(Debug, Default)]
pub struct MemorySaver {
    runs: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every run with at least one checkpoint, sorted.
    pub async fn run_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runs.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl Checkpointer for MemorySaver {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let mut runs = self.runs.write().await;
        let history = runs.entry(checkpoint.run_id.clone()).or_default();
        ensure_appends(&checkpoint.run_id, checkpoint.seq, history.last().map(|c| c.seq))?;
        history.push(checkpoint.clone());
        Ok(())
    }

    async fn get_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self
            .runs
            .read()
            .await
            .get(run_id)
            .and_then(|h| h.last().cloned()))
    }

    async fn list(&self, run_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        Ok(self
            .runs
            .read()
            .await
            .get(run_id)
            .cloned()
            .unwrap_or_default())
    }
}
