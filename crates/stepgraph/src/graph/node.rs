//! Graph node trait and the registry that owns a graph's nodes.
//!
//! A node is one step: it reads a state snapshot and returns the fields it changed.
//! It may call external collaborators (e.g. an LLM) and may await them; the executor
//! waits for the result before choosing the next node.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{RegistryError, StepError};
use crate::state::{PartialState, State};

use super::next::{END, START};

/// One step in a graph: state snapshot in, partial update out.
///
/// The node only ever sees `&State`; it cannot change the authoritative state except
/// through the returned `PartialState`. Returning an empty update is legal and means
/// "no change".
///
/// **Interaction**: Registered via `StateGraph::add_node`; called by
/// `CompiledStateGraph::step`.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: &State) -> Result<PartialState, StepError>;
}

#[async_trait]
impl<N> Node for Arc<N>
where
    N: Node + ?Sized,
{
    async fn run(&self, state: &State) -> Result<PartialState, StepError> {
        (**self).run(state).await
    }
}

/// Adapts an async closure `Fn(State) -> Future<Output = Result<PartialState, StepError>>`
/// into a `Node`. The closure receives its own copy of the snapshot.
pub struct FnNode<F> {
    f: F,
}

/// Wraps an async closure as a node.
pub fn node_fn<F, Fut>(f: F) -> FnNode<F>
where
    F: Fn(State) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PartialState, StepError>> + Send + 'static,
{
    FnNode { f }
}

#[async_trait]
impl<F, Fut> Node for FnNode<F>
where
    F: Fn(State) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PartialState, StepError>> + Send + 'static,
{
    async fn run(&self, state: &State) -> Result<PartialState, StepError> {
        (self.f)(state.clone()).await
    }
}

/// Name → node map. Read-only once the graph is compiled.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, Arc<dyn Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node. Names must be unique and must not be a sentinel.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        node: Arc<dyn Node>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name == START || name == END {
            return Err(RegistryError::ReservedName(name));
        }
        if self.nodes.contains_key(&name) {
            return Err(RegistryError::DuplicateNode(name));
        }
        self.nodes.insert(name, node);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn Node>, RegistryError> {
        self.nodes
            .get(name)
            .ok_or_else(|| RegistryError::UnknownNode(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn Node> {
        Arc::new(node_fn(|_state| async { Ok(PartialState::new()) }))
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut reg = NodeRegistry::new();
        reg.register("a", noop()).unwrap();
        assert_eq!(
            reg.register("a", noop()),
            Err(RegistryError::DuplicateNode("a".into()))
        );
    }

    #[test]
    fn register_rejects_sentinels() {
        let mut reg = NodeRegistry::new();
        assert_eq!(
            reg.register(END, noop()),
            Err(RegistryError::ReservedName(END.into()))
        );
        assert_eq!(
            reg.register(START, noop()),
            Err(RegistryError::ReservedName(START.into()))
        );
    }

    #[test]
    fn lookup_unknown_fails() {
        let reg = NodeRegistry::new();
        assert!(matches!(reg.lookup("x"), Err(RegistryError::UnknownNode(n)) if n == "x"));
    }

    #[tokio::test]
    async fn fn_node_gets_snapshot() {
        let node = node_fn(|state: State| async move {
            let seen = state.get_str("topic").unwrap_or("none").to_string();
            Ok(PartialState::new().set("echo", seen))
        });
        let out = node.run(&State::default()).await.unwrap();
        assert_eq!(out.get("echo"), Some(&serde_json::Value::from("none")));
    }
}
