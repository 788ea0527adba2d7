//! Error types for graph definition, state merging, routing and runs.
//!
//! - `RegistryError`: node registration / lookup misuse (definition time)
//! - `StateError`: partial update rejected by the state schema
//! - `StepError`: a node's step function (or its collaborator) failed
//! - `RoutingError`: next node could not be determined
//! - `RunError`: everything that can end a run early
//!
//! Compilation errors live in `graph::CompilationError`; checkpoint store errors in
//! `memory::CheckpointError`.

use thiserror::Error;

use crate::memory::CheckpointError;

/// Node registry misuse. Returned immediately by `StateGraph::add_node` / `NodeRegistry`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A node with this name is already registered.
    #[error("duplicate node: {0}")]
    DuplicateNode(String),
    /// No node with this name is registered.
    #[error("unknown node: {0}")]
    UnknownNode(String),
    /// `__start__` and `__end__` are reserved for the graph's sentinels.
    #[error("reserved node name: {0}")]
    ReservedName(String),
}

/// A partial update (or initial values) that does not fit the declared state schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Field is not declared in the schema.
    #[error("unknown state field: {0}")]
    UnknownField(String),
    /// Value has the wrong JSON type for the field.
    #[error("field `{field}` expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    /// Value is a string but not one of the field's enum variants.
    #[error("field `{field}` does not accept {value:?} (allowed: {allowed:?})")]
    InvalidVariant {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
}

/// Failure reported by a node's step function.
///
/// Collaborator failures (LLM timeout, API error, malformed response) are wrapped as
/// `Collaborator`; the executor never looks inside them.
#[derive(Debug, Error)]
pub enum StepError {
    /// External collaborator failed.
    #[error("collaborator error: {0}")]
    Collaborator(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The step itself could not produce an update (e.g. required input missing).
    #[error("{0}")]
    Failed(String),
}

impl StepError {
    /// Wraps any collaborator error.
    pub fn collaborator<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Collaborator(err.into())
    }

    /// Builds a plain step failure from a message.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// The next node could not be determined after a step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// Routing function returned a key that has no entry in the outcome map.
    #[error("node `{node}`: route key `{key}` is not mapped to a destination")]
    Unmapped { node: String, key: String },
    /// Routing function could not derive any key from the state.
    #[error("node `{node}`: routing function produced no route key")]
    NoRouteKey { node: String },
    /// Node has no outgoing edge at all (graph incomplete).
    #[error("node `{node}` has no outgoing edge")]
    Dangling { node: String },
}

/// Anything that ends a run before it reaches the terminal sentinel.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("step failed: {0}")]
    Step(#[from] StepError),
    #[error("invalid state update: {0}")]
    State(#[from] StateError),
    #[error("routing failed: {0}")]
    Routing(#[from] RoutingError),
    #[error("checkpoint store: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Cycle guard: the run already completed the configured number of steps.
    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(u64),
    /// Cancellation was requested; honoured between steps.
    #[error("run cancelled")]
    Cancelled,
    /// `resume` was called for a run that has no stored history.
    #[error("no checkpoint for run `{0}`")]
    NoCheckpoint(String),
    /// `resume` / history access on a graph compiled without a checkpointer.
    #[error("graph has no checkpointer")]
    NoCheckpointer,
}

impl RunError {
    /// Short, stable name of the error kind, used in failure reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Step(_) => "step_failure",
            RunError::State(_) => "state_error",
            RunError::Routing(_) => "routing_error",
            RunError::Checkpoint(_) => "checkpoint_error",
            RunError::Registry(_) => "registry_error",
            RunError::StepLimitExceeded(_) => "step_limit_exceeded",
            RunError::Cancelled => "cancelled",
            RunError::NoCheckpoint(_) => "no_checkpoint",
            RunError::NoCheckpointer => "no_checkpointer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_keeps_collaborator_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "llm timed out");
        let err = StepError::collaborator(io);
        assert!(err.to_string().contains("llm timed out"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn run_error_kind_names() {
        assert_eq!(RunError::Cancelled.kind(), "cancelled");
        assert_eq!(RunError::StepLimitExceeded(3).kind(), "step_limit_exceeded");
        let routing: RunError = RoutingError::Dangling { node: "a".into() }.into();
        assert_eq!(routing.kind(), "routing_error");
    }
}
