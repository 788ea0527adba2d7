//! Language-model collaborator: client trait, request/response types, errors.
//!
//! - `LlmClient`: async chat interface used by the workflow nodes
//! - `OpenAiClient`: OpenAI-compatible Chat Completions (OpenAI, Groq, local proxies)
//! - `ScriptedLlm`: deterministic client for tests and dry runs

mod error;
mod openai;
mod scripted;
mod types;

use async_trait::async_trait;

pub use error::LlmError;
pub use openai::{LlmConfig, OpenAiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use scripted::ScriptedLlm;
pub use types::{ChatMessage, ChatRequest, ChatResponse, MessageRole, Usage};

/// LLM client: sends one conversation, returns the full reply.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError>;
}
