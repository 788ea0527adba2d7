//! Run configuration and the executor's run states.
//!
//! A run is `Running` until it reaches the terminal sentinel (`Terminated`) or stops
//! on an error (`Failed`). Neither terminal state transitions further; continuing a
//! failed run means calling `CompiledStateGraph::resume` with the same run id.

use std::fmt;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::RunError;
use crate::state::State;

/// Per-run settings: identity, optional cycle guard, cancellation.
///
/// **Interaction**: Passed to `CompiledStateGraph::invoke` / `resume` / `step`.
/// `run_id` keys every checkpoint written for the run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Identifies the run in the checkpoint store.
    pub run_id: String,
    /// The run may complete at most this many steps (counted by checkpoint sequence).
    pub max_steps: Option<u64>,
    /// Checked before each step; an in-flight step always completes first.
    pub cancel: CancellationToken,
}

impl RunConfig {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            max_steps: None,
            cancel: CancellationToken::new(),
        }
    }

    /// New config with a fresh time-ordered run id.
    pub fn generated() -> Self {
        Self::new(Uuid::now_v7().to_string())
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Why and where a run stopped, plus what survives for a resume.
#[derive(Debug)]
pub struct RunFailure {
    pub run_id: String,
    /// Node that was about to run or that failed; `None` before the first step.
    pub node: Option<String>,
    pub error: RunError,
    /// Sequence number of the last checkpoint written for this run, if any.
    pub last_checkpoint: Option<u64>,
    /// Last good state (the one stored in `last_checkpoint` when there is one).
    pub state: State,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run `{}` failed", self.run_id)?;
        if let Some(node) = &self.node {
            write!(f, " at node `{node}`")?;
        }
        write!(f, " [{}]: {}", self.error.kind(), self.error)?;
        match self.last_checkpoint {
            Some(seq) => write!(f, " (last checkpoint: step {seq})"),
            None => write!(f, " (no checkpoint)"),
        }
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Executor state machine.
#[derive(Debug)]
pub enum RunStatus {
    /// `node` runs next on `state`; `seq` is the number of steps completed so far.
    Running { node: String, state: State, seq: u64 },
    /// Reached the terminal sentinel after `seq` steps.
    Terminated { state: State, seq: u64 },
    Failed(RunFailure),
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running { .. })
    }

    /// Current state, whichever variant.
    pub fn state(&self) -> &State {
        match self {
            RunStatus::Running { state, .. } | RunStatus::Terminated { state, .. } => state,
            RunStatus::Failed(failure) => &failure.state,
        }
    }
}
