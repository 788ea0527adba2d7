//! Checkpoint and metadata types.
//!
//! One checkpoint is written before the first step (`Input`, seq 0) and one after
//! every executed node (`Loop`). Checkpoints are never mutated; the one with the
//! highest `seq` for a run is its resume point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{Destination, Resolved};
use crate::state::State;

/// Why a checkpoint was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSource {
    /// Initial state of a run, before any node ran.
    Input,
    /// After a node ran and its update was merged.
    Loop,
}

impl CheckpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointSource::Input => "input",
            CheckpointSource::Loop => "loop",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(CheckpointSource::Input),
            "loop" => Some(CheckpointSource::Loop),
            _ => None,
        }
    }
}

/// Metadata for a single checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    pub created_at: DateTime<Utc>,
}

/// State snapshot plus position in the graph.
///
/// **Interaction**: Produced by `CompiledStateGraph` during a run; stored through
/// `Checkpointer::put`; read back by `resume`, `get_state` and `state_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: String,
    /// Steps completed when this snapshot was taken.
    pub seq: u64,
    /// Node whose update produced `state`; `None` for the input checkpoint.
    pub node: Option<String>,
    pub state: State,
    /// Where the run continues. `None` when routing failed; resume re-resolves it.
    pub next: Option<Destination>,
    /// Route key chosen by a conditional edge, if any.
    pub route: Option<String>,
    pub metadata: CheckpointMetadata,
}

impl Checkpoint {
    /// Checkpoint of a run's initial state, pointing at the start node.
    pub fn input(run_id: impl Into<String>, state: State, start: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            seq: 0,
            node: None,
            state,
            next: Some(Destination::Node(start.into())),
            route: None,
            metadata: CheckpointMetadata {
                source: CheckpointSource::Input,
                created_at: Utc::now(),
            },
        }
    }

    /// Checkpoint after `node` ran, with its routing outcome (`None` when routing failed).
    pub fn after_step(
        run_id: impl Into<String>,
        seq: u64,
        node: impl Into<String>,
        state: State,
        resolved: Option<&Resolved>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            seq,
            node: Some(node.into()),
            state,
            next: resolved.map(|r| r.destination.clone()),
            route: resolved.and_then(|r| r.route).map(str::to_string),
            metadata: CheckpointMetadata {
                source: CheckpointSource::Loop,
                created_at: Utc::now(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_checkpoint_points_at_start() {
        let cp = Checkpoint::input("r1", State::default(), "Developer");
        assert_eq!(cp.seq, 0);
        assert_eq!(cp.node, None);
        assert_eq!(cp.next, Some(Destination::Node("Developer".into())));
        assert_eq!(cp.metadata.source, CheckpointSource::Input);
    }

    #[test]
    fn after_step_records_route() {
        let resolved = Resolved {
            destination: Destination::End,
            route: Some("Approved"),
        };
        let cp = Checkpoint::after_step("r1", 3, "Manager", State::default(), Some(&resolved));
        assert_eq!(cp.node.as_deref(), Some("Manager"));
        assert_eq!(cp.next, Some(Destination::End));
        assert_eq!(cp.route.as_deref(), Some("Approved"));
        assert_eq!(cp.metadata.source, CheckpointSource::Loop);
    }

    #[test]
    fn source_names_round_trip() {
        for s in [CheckpointSource::Input, CheckpointSource::Loop] {
            assert_eq!(CheckpointSource::parse(s.as_str()), Some(s));
        }
        assert_eq!(CheckpointSource::parse("fork"), None);
    }
}
