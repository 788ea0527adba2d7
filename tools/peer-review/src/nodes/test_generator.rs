//! Test Case Generator: writes tests for the approved code.

use std::sync::Arc;

use async_trait::async_trait;
use stepgraph::{Node, PartialState, State, StepError};

use super::{ask, prompts};
use crate::llm::{ChatRequest, LlmClient};
use crate::state::{SOURCE_CODE, TEST_CASES, TOPIC};
use crate::workflow::TEST_CASE_GENERATOR;

/// Generates `test_cases`; needs both `topic` and `source_code`.
pub struct TestCaseGeneratorNode {
    llm: Arc<dyn LlmClient>,
}

impl TestCaseGeneratorNode {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node for TestCaseGeneratorNode {
    async fn run(&self, state: &State) -> Result<PartialState, StepError> {
        let (Some(topic), Some(code)) = (state.get_str(TOPIC), state.get_str(SOURCE_CODE)) else {
            return Err(StepError::failed(
                "test generation needs both `topic` and `source_code`",
            ));
        };
        let req = ChatRequest::with_system(
            prompts::TEST_CASE_GENERATOR,
            prompts::test_generation_input(topic, code),
        );
        let tests = ask(self.llm.as_ref(), TEST_CASE_GENERATOR, req).await?;
        Ok(PartialState::new().set(TEST_CASES, tests))
    }
}
