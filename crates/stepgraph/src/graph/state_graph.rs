//! State graph builder: nodes, unconditional and conditional edges, start node.
//!
//! Add nodes with `add_node`, wire them with `add_edge` / `add_conditional_edges`,
//! then `compile` or `compile_with_checkpointer` to get a `CompiledStateGraph`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use crate::error::RegistryError;
use crate::graph::compile_error::{CompilationError, CompileWarning, Violation};
use crate::graph::compiled::CompiledStateGraph;
use crate::graph::edge::{Edge, EdgeTable, RouteKey};
use crate::graph::next::{Destination, START};
use crate::graph::node::{Node, NodeRegistry};
use crate::memory::Checkpointer;
use crate::state::{State, StateSchema};

/// State graph: schema, nodes, edges and the start node.
///
/// Cycles are allowed. Nothing is checked until `compile`, except node registration,
/// which fails immediately on duplicate or reserved names.
///
/// **Interaction**: Accepts any `Node`; produces `CompiledStateGraph`.
pub struct StateGraph {
    schema: StateSchema,
    registry: NodeRegistry,
    edges: EdgeTable,
    start: Option<String>,
    /// Set when the start node was declared more than once.
    start_conflict: bool,
}

impl StateGraph {
    /// Creates an empty graph over `schema`.
    pub fn new(schema: StateSchema) -> Self {
        Self {
            schema,
            registry: NodeRegistry::new(),
            edges: EdgeTable::new(),
            start: None,
            start_conflict: false,
        }
    }

    /// Registers a node under a unique name.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        node: impl Node + 'static,
    ) -> Result<&mut Self, RegistryError> {
        self.registry.register(name, Arc::new(node))?;
        Ok(self)
    }

    /// `from → to`. `add_edge(START, name)` sets the start node; `to` may be `END`.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        let from = from.into();
        if from == START {
            return self.set_start(to);
        }
        self.edges.add_unconditional(from, to);
        self
    }

    /// `from → route(state) → outcomes[key]`. Every variant of `K` needs an outcome.
    pub fn add_conditional_edges<K, F, I, D>(
        &mut self,
        from: impl Into<String>,
        route: F,
        outcomes: I,
    ) -> &mut Self
    where
        K: RouteKey,
        F: Fn(&State) -> Option<K> + Send + Sync + 'static,
        I: IntoIterator<Item = (K, D)>,
        D: Into<String>,
    {
        self.edges.add_conditional(from, route, outcomes);
        self
    }

    pub fn set_start(&mut self, name: impl Into<String>) -> &mut Self {
        if self.start.is_some() {
            self.start_conflict = true;
        } else {
            self.start = Some(name.into());
        }
        self
    }

    /// Builds the executable graph without persistence; `resume` is unavailable.
    pub fn compile(self) -> Result<CompiledStateGraph, CompilationError> {
        self.compile_with_checkpointer_opt(None)
    }

    /// Builds the executable graph with a checkpointer: every step is saved under the
    /// run id and runs can be resumed.
    pub fn compile_with_checkpointer(
        self,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Result<CompiledStateGraph, CompilationError> {
        self.compile_with_checkpointer_opt(Some(checkpointer))
    }

    fn compile_with_checkpointer_opt(
        self,
        checkpointer: Option<Arc<dyn Checkpointer>>,
    ) -> Result<CompiledStateGraph, CompilationError> {
        let violations = self.validate();
        if !violations.is_empty() {
            return Err(CompilationError { violations });
        }
        let start = match self.start {
            Some(start) => start,
            None => {
                return Err(CompilationError {
                    violations: vec![Violation::MissingStart],
                })
            }
        };

        let warnings = collect_warnings(&self.registry, &self.edges, &start);
        for w in &warnings {
            warn!(warning = %w, "graph compiled with warning");
        }

        Ok(CompiledStateGraph {
            schema: self.schema,
            registry: self.registry,
            edges: self.edges,
            start,
            checkpointer,
            warnings,
        })
    }

    /// Every structural defect, in a stable order.
    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        match &self.start {
            None => violations.push(Violation::MissingStart),
            Some(start) if !self.registry.contains(start) => {
                violations.push(Violation::UnknownStart(start.clone()))
            }
            Some(_) => {}
        }
        if self.start_conflict {
            violations.push(Violation::ConflictingEdges(START.to_string()));
        }

        let known = |d: &Destination| match d {
            Destination::End => true,
            Destination::Node(n) => self.registry.contains(n),
        };

        for (from, edge) in self.edges.iter() {
            if !self.registry.contains(from) {
                violations.push(Violation::UnknownSource(from.to_string()));
            }
            match edge {
                Edge::Unconditional(to) => {
                    if !known(to) {
                        violations.push(Violation::UnknownTarget {
                            from: from.to_string(),
                            to: to.to_string(),
                        });
                    }
                }
                Edge::Conditional(c) => {
                    for (key, to) in c.outcomes() {
                        if !known(to) {
                            violations.push(Violation::UnknownOutcomeTarget {
                                from: from.to_string(),
                                key: key.to_string(),
                                to: to.to_string(),
                            });
                        }
                    }
                    for key in c.missing_outcomes() {
                        violations.push(Violation::MissingOutcome {
                            from: from.to_string(),
                            key: key.to_string(),
                        });
                    }
                    for key in c.duplicate_outcomes() {
                        violations.push(Violation::DuplicateOutcome {
                            from: from.to_string(),
                            key: key.to_string(),
                        });
                    }
                }
            }
        }

        for from in self.edges.conflicts() {
            violations.push(Violation::ConflictingEdges(from.clone()));
        }
        violations
    }
}

/// Depth-first reachability from `start`.
fn reachable(edges: &EdgeTable, start: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![start.to_string()];
    while let Some(node) = stack.pop() {
        if !seen.insert(node.clone()) {
            continue;
        }
        if let Some(edge) = edges.get(&node) {
            for target in edge.targets() {
                if let Destination::Node(next) = target {
                    if !seen.contains(next) {
                        stack.push(next.clone());
                    }
                }
            }
        }
    }
    seen
}

fn collect_warnings(registry: &NodeRegistry, edges: &EdgeTable, start: &str) -> Vec<CompileWarning> {
    let reached = reachable(edges, start);
    let mut warnings = Vec::new();
    for name in registry.names() {
        if !reached.contains(name) {
            warnings.push(CompileWarning::Unreachable(name.to_string()));
        } else if edges.get(name).is_none() {
            warnings.push(CompileWarning::NoOutgoingEdge(name.to_string()));
        }
    }
    warnings
}
