//! State graph: nodes, unconditional and conditional edges, compile and run.
//!
//! Aligns with LangGraph `StateGraph`: add nodes and edges, compile (optionally with
//! a checkpointer), then invoke with initial state or resume by run id.

mod compile_error;
mod compiled;
mod edge;
mod next;
mod node;
mod run;
mod state_graph;

pub use compile_error::{CompilationError, CompileWarning, Violation};
pub use compiled::CompiledStateGraph;
pub use edge::{ConditionalEdge, Edge, EdgeTable, RouteKey};
pub use next::{Destination, Resolved, END, START};
pub use node::{node_fn, FnNode, Node, NodeRegistry};
pub use run::{RunConfig, RunFailure, RunStatus};
pub use state_graph::StateGraph;
