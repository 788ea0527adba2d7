//! Graph compilation error and warnings.
//!
//! Returned by `StateGraph::compile`. Validation collects every defect before
//! failing, so one pass shows them all.

use std::fmt;

/// One structural defect found while compiling a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// No start node: neither `set_start` nor `add_edge(START, ..)` was called.
    MissingStart,
    /// Start node is not registered.
    UnknownStart(String),
    /// An edge leaves a node that is not registered.
    UnknownSource(String),
    /// An unconditional edge points at an unregistered node.
    UnknownTarget { from: String, to: String },
    /// An outcome-map entry points at an unregistered node.
    UnknownOutcomeTarget { from: String, key: String, to: String },
    /// A route key variant has no entry in the outcome map.
    MissingOutcome { from: String, key: String },
    /// A route key appears more than once in the outcome map.
    DuplicateOutcome { from: String, key: String },
    /// More than one outgoing edge set was declared for this source.
    ConflictingEdges(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingStart => write!(f, "no start node"),
            Violation::UnknownStart(n) => write!(f, "start node `{n}` is not registered"),
            Violation::UnknownSource(n) => write!(f, "edge source `{n}` is not registered"),
            Violation::UnknownTarget { from, to } => {
                write!(f, "edge `{from}` -> `{to}`: target is not registered")
            }
            Violation::UnknownOutcomeTarget { from, key, to } => write!(
                f,
                "conditional edge `{from}`: outcome `{key}` -> `{to}` is not registered"
            ),
            Violation::MissingOutcome { from, key } => {
                write!(f, "conditional edge `{from}`: no outcome for `{key}`")
            }
            Violation::DuplicateOutcome { from, key } => {
                write!(f, "conditional edge `{from}`: outcome `{key}` is given more than once")
            }
            Violation::ConflictingEdges(n) => {
                write!(f, "node `{n}` has more than one outgoing edge set")
            }
        }
    }
}

/// Error when compiling a state graph; lists every violation found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph has {} defect(s)", self.violations.len())?;
        for v in &self.violations {
            write!(f, "\n  - {v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilationError {}

/// Non-fatal finding; logged at compile time and kept on the compiled graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileWarning {
    /// Registered but not reachable from the start node (dead code).
    Unreachable(String),
    /// Reachable node with no outgoing edge; a run reaching it fails with `RoutingError::Dangling`.
    NoOutgoingEdge(String),
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::Unreachable(n) => write!(f, "node `{n}` is unreachable from start"),
            CompileWarning::NoOutgoingEdge(n) => write!(f, "node `{n}` has no outgoing edge"),
        }
    }
}
