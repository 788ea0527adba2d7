//! Developer: writes (or rewrites) the code for the topic.

use std::sync::Arc;

use async_trait::async_trait;
use stepgraph::{Node, PartialState, State, StepError};

use super::{ask, prompts};
use crate::llm::{ChatRequest, LlmClient};
use crate::state::{FEEDBACK, SOURCE_CODE, TOPIC};
use crate::workflow::DEVELOPER;

/// Writes code for `topic`, taking the latest `feedback` into account when present.
pub struct DeveloperNode {
    llm: Arc<dyn LlmClient>,
}

impl DeveloperNode {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node for DeveloperNode {
    async fn run(&self, state: &State) -> Result<PartialState, StepError> {
        let topic = state
            .get_str(TOPIC)
            .ok_or_else(|| StepError::failed("`topic` is required"))?;
        let system = match state.get_str(FEEDBACK).filter(|f| !f.trim().is_empty()) {
            Some(feedback) => prompts::developer_with_feedback(feedback),
            None => prompts::DEVELOPER.to_string(),
        };
        let req = ChatRequest::with_system(system, prompts::topic_input(topic));
        let code = ask(self.llm.as_ref(), DEVELOPER, req).await?;
        Ok(PartialState::new().set(SOURCE_CODE, code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;
    use crate::nodes::test_state;

    #[tokio::test]
    async fn writes_code_for_topic() {
        let llm = Arc::new(ScriptedLlm::with_replies(["fn rev() {}"]));
        let node = DeveloperNode::new(llm.clone());
        let out = node
            .run(&test_state(&[(TOPIC, "reverse a string")]))
            .await
            .unwrap();
        assert_eq!(out.get(SOURCE_CODE), Some(&"fn rev() {}".into()));
        let requests = llm.requests();
        let req = &requests[0];
        assert_eq!(req.user_prompt(), Some("Here is the request: reverse a string"));
        assert!(!req.system_prompt().unwrap_or_default().contains("feedback"));
    }

    #[tokio::test]
    async fn includes_feedback_in_prompt() {
        let llm = Arc::new(ScriptedLlm::with_replies(["fn rev2() {}"]));
        let node = DeveloperNode::new(llm.clone());
        let state = test_state(&[(TOPIC, "reverse a string"), (FEEDBACK, "missing edge case")]);
        node.run(&state).await.unwrap();
        let system = llm.requests()[0].system_prompt().unwrap_or_default().to_string();
        assert!(system.contains("missing edge case"));
    }

    #[tokio::test]
    async fn missing_topic_is_a_step_failure() {
        let llm = Arc::new(ScriptedLlm::new());
        let err = DeveloperNode::new(llm.clone())
            .run(&test_state(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Failed(_)));
        assert!(llm.requests().is_empty());
    }
}
