//! Directed-graph step executor with conditional routing and state checkpointing.
//!
//! A graph is a set of named nodes (async step functions over a shared, schema-checked
//! state) wired by unconditional and conditional edges. Cycles are allowed. The
//! compiled graph runs as an explicit state machine, merging each node's partial
//! update and writing a checkpoint after every step so runs can be resumed by id.
//!
//! ```ignore
//! let mut graph = StateGraph::new(schema);
//! graph.add_node("draft", draft)?.add_node("review", review)?;
//! graph
//!     .add_edge(START, "draft")
//!     .add_edge("draft", "review")
//!     .add_conditional_edges("review", verdict, [(Verdict::Pass, END), (Verdict::Fail, "draft")]);
//! let compiled = graph.compile_with_checkpointer(Arc::new(MemorySaver::new()))?;
//! let state = compiled.invoke(initial, &RunConfig::generated()).await?;
//! ```

pub mod error;
pub mod graph;
pub mod memory;
pub mod state;

pub use error::{RegistryError, RoutingError, RunError, StateError, StepError};
pub use graph::{
    node_fn, CompilationError, CompileWarning, CompiledStateGraph, Destination, EdgeTable, Node,
    NodeRegistry, RouteKey, RunConfig, RunFailure, RunStatus, StateGraph, Violation, END, START,
};
pub use memory::{Checkpoint, CheckpointError, CheckpointSource, Checkpointer, JsonSerializer, MemorySaver};
#[cfg(feature = "sqlite")]
pub use memory::SqliteSaver;
pub use state::{FieldKind, PartialState, State, StateSchema};
