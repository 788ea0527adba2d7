//! Scripted LLM for tests and offline runs.
//!
//! Replies are consumed in order; every request is recorded so tests can check
//! what each node sent.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::error::LlmError;
use super::types::{ChatRequest, ChatResponse, Usage};
use super::LlmClient;

/// Deterministic `LlmClient`: returns queued replies (or errors) in order.
///
/// An empty queue answers with `LlmError::ApiError`.
///
/// **Interaction**: Implements `LlmClient`; shared as `Arc<ScriptedLlm>` so a test can
/// queue more replies after a failed run and then resume.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from replies, answered in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let llm = Self::new();
        for r in replies {
            llm.push_reply(r);
        }
        llm
    }

    pub fn push_reply(&self, content: impl Into<String>) {
        self.queue().push_back(Ok(content.into()));
    }

    pub fn push_error(&self, err: LlmError) {
        self.queue().push_back(Err(err));
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue().len()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req);
        let next = self.queue().pop_front();
        match next {
            Some(Ok(content)) => Ok(ChatResponse {
                content,
                usage: Usage::default(),
            }),
            Some(Err(e)) => Err(e),
            None => Err(LlmError::ApiError("scripted replies exhausted".into())),
        }
    }
}
