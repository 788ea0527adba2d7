//! Test Case Reviewer: checks the tests against the request and the code.

use std::sync::Arc;

use async_trait::async_trait;
use stepgraph::{Node, PartialState, RouteKey, State, StepError};

use super::{ask_review, prompts};
use crate::llm::{ChatRequest, LlmClient};
use crate::state::{FEEDBACK, SOURCE_CODE, TEST_CASES, TEST_CASE_REVIEW_STATUS, TOPIC};
use crate::workflow::TEST_CASE_REVIEWER;

/// Reviews `test_cases`; changes nothing unless topic, code and tests are all present.
pub struct TestCaseReviewerNode {
    llm: Arc<dyn LlmClient>,
}

impl TestCaseReviewerNode {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node for TestCaseReviewerNode {
    async fn run(&self, state: &State) -> Result<PartialState, StepError> {
        let (Some(topic), Some(code), Some(tests)) = (
            state.get_str(TOPIC),
            state.get_str(SOURCE_CODE),
            state.get_str(TEST_CASES),
        ) else {
            return Ok(PartialState::new());
        };
        let req = ChatRequest::with_system(
            prompts::test_case_reviewer(),
            prompts::test_review_input(topic, code, tests),
        );
        let review = ask_review(self.llm.as_ref(), TEST_CASE_REVIEWER, req).await?;
        Ok(PartialState::new()
            .set(TEST_CASE_REVIEW_STATUS, review.status.as_str())
            .set(FEEDBACK, review.feedback))
    }
}
