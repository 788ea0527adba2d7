//! Code Reviewer: approves the code or sends it back with feedback.

use std::sync::Arc;

use async_trait::async_trait;
use stepgraph::{Node, PartialState, RouteKey, State, StepError};

use super::{ask_review, prompts};
use crate::llm::{ChatRequest, LlmClient};
use crate::state::{CODE_REVIEW_STATUS, FEEDBACK, SOURCE_CODE};
use crate::workflow::CODE_REVIEWER;

/// Reviews `source_code`; without code it changes nothing.
pub struct CodeReviewerNode {
    llm: Arc<dyn LlmClient>,
}

impl CodeReviewerNode {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node for CodeReviewerNode {
    async fn run(&self, state: &State) -> Result<PartialState, StepError> {
        let Some(code) = state.get_str(SOURCE_CODE) else {
            return Ok(PartialState::new());
        };
        let req = ChatRequest::with_system(prompts::code_reviewer(), prompts::code_input(code));
        let review = ask_review(self.llm.as_ref(), CODE_REVIEWER, req).await?;
        Ok(PartialState::new()
            .set(CODE_REVIEW_STATUS, review.status.as_str())
            .set(FEEDBACK, review.feedback))
    }
}
