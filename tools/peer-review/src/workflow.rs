//! The peer-review graph: Developer → Code Reviewer → Test Case Generator →
//! Test Case Reviewer → Manager, with rejection loops back to the Developer.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stepgraph::{
    Checkpointer, CompilationError, CompiledStateGraph, RegistryError, State, StateGraph, END,
    START,
};
use thiserror::Error;

use crate::llm::LlmClient;
use crate::nodes::{
    CodeReviewerNode, DeveloperNode, Manager, ManagerNode, TestCaseGeneratorNode,
    TestCaseReviewerNode,
};
use crate::review::ReviewStatus;
use crate::state::{self, CODE_REVIEW_STATUS, MANAGER_APPROVAL_STATUS, TEST_CASE_REVIEW_STATUS};

pub const DEVELOPER: &str = "Developer";
pub const CODE_REVIEWER: &str = "Code Reviewer";
pub const TEST_CASE_GENERATOR: &str = "Test Case Generator";
pub const TEST_CASE_REVIEWER: &str = "Test Case Reviewer";
pub const MANAGER: &str = "Manager";

/// Configured manager behaviour (see `Manager` for the runtime form).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerMode {
    /// Manager only clears its fields; the run ends after the test review.
    #[default]
    Passthrough,
    /// Manager approval is required; rejection loops back to the developer.
    Gate,
}

impl FromStr for ManagerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "passthrough" => Ok(ManagerMode::Passthrough),
            "gate" => Ok(ManagerMode::Gate),
            other => Err(format!("unknown manager mode `{other}` (expected passthrough or gate)")),
        }
    }
}

impl fmt::Display for ManagerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ManagerMode::Passthrough => "passthrough",
            ManagerMode::Gate => "gate",
        })
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Compilation(#[from] CompilationError),
}

fn status_of(state: &State, field: &str) -> Option<ReviewStatus> {
    state.get_str(field).and_then(ReviewStatus::parse)
}

pub fn code_review_route(state: &State) -> Option<ReviewStatus> {
    status_of(state, CODE_REVIEW_STATUS)
}

pub fn test_case_review_route(state: &State) -> Option<ReviewStatus> {
    status_of(state, TEST_CASE_REVIEW_STATUS)
}

pub fn manager_route(state: &State) -> Option<ReviewStatus> {
    status_of(state, MANAGER_APPROVAL_STATUS)
}

/// Defines the five-node graph over `state::schema()`.
pub fn build_workflow(llm: Arc<dyn LlmClient>, manager: Manager) -> Result<StateGraph, WorkflowError> {
    let gated = matches!(manager, Manager::Gate(_));

    let mut graph = StateGraph::new(state::schema());
    graph
        .add_node(DEVELOPER, DeveloperNode::new(llm.clone()))?
        .add_node(CODE_REVIEWER, CodeReviewerNode::new(llm.clone()))?
        .add_node(TEST_CASE_GENERATOR, TestCaseGeneratorNode::new(llm.clone()))?
        .add_node(TEST_CASE_REVIEWER, TestCaseReviewerNode::new(llm))?
        .add_node(MANAGER, ManagerNode::new(manager))?;

    graph
        .add_edge(START, DEVELOPER)
        .add_edge(DEVELOPER, CODE_REVIEWER)
        .add_conditional_edges(
            CODE_REVIEWER,
            code_review_route,
            [
                (ReviewStatus::Approved, TEST_CASE_GENERATOR),
                (ReviewStatus::Rejected, DEVELOPER),
            ],
        )
        .add_edge(TEST_CASE_GENERATOR, TEST_CASE_REVIEWER)
        .add_conditional_edges(
            TEST_CASE_REVIEWER,
            test_case_review_route,
            [
                (ReviewStatus::Approved, MANAGER),
                (ReviewStatus::Rejected, DEVELOPER),
            ],
        );

    if gated {
        graph.add_conditional_edges(
            MANAGER,
            manager_route,
            [(ReviewStatus::Approved, END), (ReviewStatus::Rejected, DEVELOPER)],
        );
    } else {
        graph.add_edge(MANAGER, END);
    }
    Ok(graph)
}

/// Builds and compiles the workflow, optionally with a checkpointer.
pub fn compile_workflow(
    llm: Arc<dyn LlmClient>,
    manager: Manager,
    checkpointer: Option<Arc<dyn Checkpointer>>,
) -> Result<CompiledStateGraph, WorkflowError> {
    let graph = build_workflow(llm, manager)?;
    let compiled = match checkpointer {
        Some(cp) => graph.compile_with_checkpointer(cp)?,
        None => graph.compile()?,
    };
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::StaticApproval;
    use crate::llm::ScriptedLlm;

    #[test]
    fn both_manager_modes_compile_cleanly() {
        let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::new());
        let passthrough = compile_workflow(llm.clone(), Manager::Passthrough, None).unwrap();
        assert!(passthrough.warnings().is_empty());
        assert_eq!(passthrough.start(), DEVELOPER);

        let gate = Manager::Gate(Arc::new(StaticApproval::approve()));
        let gated = compile_workflow(llm, gate, None).unwrap();
        assert!(gated.warnings().is_empty());
    }

    #[test]
    fn manager_mode_parses_case_insensitively() {
        assert_eq!("Gate".parse::<ManagerMode>(), Ok(ManagerMode::Gate));
        assert_eq!("passthrough".parse::<ManagerMode>(), Ok(ManagerMode::Passthrough));
        assert!("auto".parse::<ManagerMode>().is_err());
        assert_eq!(ManagerMode::default(), ManagerMode::Passthrough);
    }
}
