//! Compiled state graph: immutable, runs one state-machine transition per step.
//!
//! Built by `StateGraph::compile`. Holds the schema, nodes, edges and optional
//! checkpointer; shared (`Arc`) across concurrent runs with distinct run ids.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{RegistryError, RunError};
use crate::graph::compile_error::CompileWarning;
use crate::graph::edge::EdgeTable;
use crate::graph::next::{Destination, Resolved};
use crate::graph::node::NodeRegistry;
use crate::graph::run::{RunConfig, RunFailure, RunStatus};
use crate::memory::{Checkpoint, Checkpointer};
use crate::state::{PartialState, State, StateSchema};

/// Compiled graph: immutable structure, executes runs.
///
/// Each step looks up the current node, runs it on the current snapshot, merges its
/// update, resolves the next node and (with a checkpointer) saves a checkpoint
/// before moving on.
///
/// **Interaction**: Built from `StateGraph`; callers use `invoke` / `resume`, or
/// `start_run` + `step` to drive a run one transition at a time.
pub struct CompiledStateGraph {
    pub(super) schema: StateSchema,
    pub(super) registry: NodeRegistry,
    pub(super) edges: EdgeTable,
    pub(super) start: String,
    pub(super) checkpointer: Option<Arc<dyn Checkpointer>>,
    pub(super) warnings: Vec<CompileWarning>,
}

fn failed(
    run_id: &str,
    node: Option<String>,
    error: impl Into<RunError>,
    last_checkpoint: Option<u64>,
    state: State,
) -> RunStatus {
    RunStatus::Failed(RunFailure {
        run_id: run_id.to_string(),
        node,
        error: error.into(),
        last_checkpoint,
        state,
    })
}

fn advance(resolved: &Resolved, state: State, seq: u64) -> RunStatus {
    match &resolved.destination {
        Destination::End => RunStatus::Terminated { state, seq },
        Destination::Node(next) => RunStatus::Running {
            node: next.clone(),
            state,
            seq,
        },
    }
}

impl CompiledStateGraph {
    /// Non-fatal findings from compilation.
    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Name of the start node.
    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn has_checkpointer(&self) -> bool {
        self.checkpointer.is_some()
    }

    /// Builds the initial state and, with a checkpointer, writes the `Input`
    /// checkpoint (seq 0). Returns `Running` at the start node, or `Failed`.
    pub async fn start_run(&self, initial: PartialState, config: &RunConfig) -> RunStatus {
        let run_id = config.run_id.as_str();
        let state = match self.schema.initial(&initial) {
            Ok(state) => state,
            Err(e) => return failed(run_id, None, e, None, State::default()),
        };

        let mut last_checkpoint = None;
        if let Some(cp) = &self.checkpointer {
            let input = Checkpoint::input(run_id, state.clone(), self.start.clone());
            if let Err(e) = cp.put(&input).await {
                return failed(run_id, None, e, None, state);
            }
            last_checkpoint = Some(0);
        }

        info!(run_id, start = %self.start, checkpointed = last_checkpoint.is_some(), "run started");
        RunStatus::Running {
            node: self.start.clone(),
            state,
            seq: 0,
        }
    }

    /// Performs one transition. Terminal statuses are returned unchanged.
    pub async fn step(&self, config: &RunConfig, status: RunStatus) -> RunStatus {
        let (node, state, seq) = match status {
            RunStatus::Running { node, state, seq } => (node, state, seq),
            terminal => return terminal,
        };
        let run_id = config.run_id.as_str();
        let last_checkpoint = self.checkpointer.as_ref().map(|_| seq);

        if config.cancel.is_cancelled() {
            return failed(run_id, Some(node), RunError::Cancelled, last_checkpoint, state);
        }
        if let Some(max) = config.max_steps {
            if seq >= max {
                return failed(
                    run_id,
                    Some(node),
                    RunError::StepLimitExceeded(max),
                    last_checkpoint,
                    state,
                );
            }
        }

        let step_fn = match self.registry.lookup(&node) {
            Ok(step_fn) => step_fn,
            Err(e) => return failed(run_id, Some(node), e, last_checkpoint, state),
        };
        let partial = match step_fn.run(&state).await {
            Ok(partial) => partial,
            Err(e) => return failed(run_id, Some(node), e, last_checkpoint, state),
        };
        let merged = match self.schema.merge(&state, &partial) {
            Ok(merged) => merged,
            Err(e) => return failed(run_id, Some(node), e, last_checkpoint, state),
        };

        let resolved = self.edges.resolve_next(&node, &merged);
        let seq = seq + 1;

        let mut last_checkpoint = last_checkpoint;
        if let Some(cp) = &self.checkpointer {
            let checkpoint =
                Checkpoint::after_step(run_id, seq, node.clone(), merged.clone(), resolved.as_ref().ok());
            if let Err(e) = cp.put(&checkpoint).await {
                return failed(run_id, Some(node), e, last_checkpoint, state);
            }
            last_checkpoint = Some(seq);
        }

        match resolved {
            Ok(resolved) => {
                debug!(
                    run_id,
                    node = %node,
                    seq,
                    next = %resolved.destination,
                    route = resolved.route.unwrap_or("-"),
                    updated = partial.len(),
                    "step completed"
                );
                advance(&resolved, merged, seq)
            }
            Err(e) => failed(run_id, Some(node), e, last_checkpoint, merged),
        }
    }

    /// Steps until the run terminates or fails.
    pub async fn run(&self, config: &RunConfig, status: RunStatus) -> Result<State, RunFailure> {
        let mut status = status;
        loop {
            status = match status {
                running @ RunStatus::Running { .. } => self.step(config, running).await,
                RunStatus::Terminated { state, seq } => {
                    info!(run_id = %config.run_id, steps = seq, "run terminated");
                    return Ok(state);
                }
                RunStatus::Failed(failure) => {
                    warn!(
                        run_id = %failure.run_id,
                        node = failure.node.as_deref().unwrap_or("-"),
                        kind = failure.error.kind(),
                        last_checkpoint = ?failure.last_checkpoint,
                        error = %failure.error,
                        "run failed"
                    );
                    return Err(failure);
                }
            };
        }
    }

    /// Starts a new run from `initial` and runs it to the end.
    ///
    /// With a checkpointer, `config.run_id` must be unused: the store only appends,
    /// so reusing an id fails with a checkpoint conflict.
    pub async fn invoke(
        &self,
        initial: PartialState,
        config: &RunConfig,
    ) -> Result<State, RunFailure> {
        let status = self.start_run(initial, config).await;
        self.run(config, status).await
    }

    /// Continues `config.run_id` from its latest checkpoint.
    pub async fn resume(&self, config: &RunConfig) -> Result<State, RunFailure> {
        let status = self.resume_point(&config.run_id).await;
        if let RunStatus::Running { node, seq, .. } = &status {
            info!(run_id = %config.run_id, node = %node, seq, "run resumed");
        }
        self.run(config, status).await
    }

    /// Status reconstructed from the run's latest checkpoint.
    ///
    /// A checkpoint whose routing failed is re-resolved against this graph, so a
    /// run stopped by a bad edge can continue once the graph is fixed.
    pub async fn resume_point(&self, run_id: &str) -> RunStatus {
        let Some(cp) = &self.checkpointer else {
            return failed(run_id, None, RunError::NoCheckpointer, None, State::default());
        };
        let latest = match cp.get_latest(run_id).await {
            Ok(Some(latest)) => latest,
            Ok(None) => {
                return failed(
                    run_id,
                    None,
                    RunError::NoCheckpoint(run_id.to_string()),
                    None,
                    State::default(),
                )
            }
            Err(e) => return failed(run_id, None, e, None, State::default()),
        };

        let Checkpoint {
            seq,
            node,
            state,
            next,
            ..
        } = latest;

        let next = match next {
            Some(next) => next,
            None => {
                let from = node.unwrap_or_else(|| self.start.clone());
                match self.edges.resolve_next(&from, &state) {
                    Ok(resolved) => resolved.destination,
                    Err(e) => return failed(run_id, Some(from), e, Some(seq), state),
                }
            }
        };

        match next {
            Destination::End => RunStatus::Terminated { state, seq },
            Destination::Node(next) if self.registry.contains(&next) => RunStatus::Running {
                node: next,
                state,
                seq,
            },
            Destination::Node(next) => {
                let err = RegistryError::UnknownNode(next.clone());
                failed(run_id, Some(next), err, Some(seq), state)
            }
        }
    }

    /// Latest checkpoint of a run, if any.
    pub async fn get_state(&self, run_id: &str) -> Result<Option<Checkpoint>, RunError> {
        let cp = self.checkpointer.as_ref().ok_or(RunError::NoCheckpointer)?;
        Ok(cp.get_latest(run_id).await?)
    }

    /// Every checkpoint of a run, ordered by seq.
    pub async fn state_history(&self, run_id: &str) -> Result<Vec<Checkpoint>, RunError> {
        let cp = self.checkpointer.as_ref().ok_or(RunError::NoCheckpointer)?;
        Ok(cp.list(run_id).await?)
    }
}
