//! The five workflow nodes and their shared model-call helpers.
//!
//! Each node reads the state snapshot, calls the model (or the approval source) and
//! returns only the fields it changed. Collaborator failures become
//! `StepError::Collaborator` so the run stops at that node with its checkpoint intact.

mod code_reviewer;
mod developer;
mod manager;
mod prompts;
mod test_generator;
mod test_reviewer;

pub use code_reviewer::CodeReviewerNode;
pub use developer::DeveloperNode;
pub use manager::{Manager, ManagerNode};
pub use test_generator::TestCaseGeneratorNode;
pub use test_reviewer::TestCaseReviewerNode;

use stepgraph::StepError;
use tracing::debug;

use crate::llm::{ChatRequest, LlmClient};
use crate::review::{parse_review, Review};

/// Sends one request and returns the reply text.
async fn ask(llm: &dyn LlmClient, node: &str, req: ChatRequest) -> Result<String, StepError> {
    let response = llm.chat(req).await.map_err(StepError::collaborator)?;
    debug!(
        node,
        chars = response.content.len(),
        completion_tokens = response.usage.completion_tokens,
        "model replied"
    );
    Ok(response.content)
}

/// Sends one review request and parses the structured verdict.
async fn ask_review(
    llm: &dyn LlmClient,
    node: &str,
    req: ChatRequest,
) -> Result<Review, StepError> {
    let raw = ask(llm, node, req).await?;
    let review = parse_review(&raw).map_err(StepError::collaborator)?;
    debug!(node, status = ?review.status, "review parsed");
    Ok(review)
}

#[cfg(test)]
pub(crate) fn test_state(fields: &[(&str, &str)]) -> stepgraph::State {
    let initial: stepgraph::PartialState = fields.iter().copied().collect();
    crate::state::schema().initial(&initial).unwrap()
}
