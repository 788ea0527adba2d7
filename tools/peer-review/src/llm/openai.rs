//! OpenAI-compatible LLM client (Chat Completions API).
//!
//! Works with any endpoint that speaks the same protocol (OpenAI, Groq, local
//! proxies) through `LlmConfig::base_url`. Credentials come only from the config
//! passed in; this module never reads the environment.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::LlmError;
use super::types::{ChatRequest, ChatResponse, Usage};
use super::LlmClient;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model id, e.g. `gpt-4o-mini` or `gemma2-9b-it`.
    pub model: String,
    /// Used when a request does not set its own temperature.
    pub default_temperature: Option<f32>,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            default_temperature: Some(0.3),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAiRequestBody<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessageOut,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessageOut {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug)]
pub struct OpenAiClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;
        let config = LlmConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_body<'a>(&'a self, req: &'a ChatRequest) -> OpenAiRequestBody<'a> {
        OpenAiRequestBody {
            model: &self.config.model,
            messages: req
                .messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: req.temperature.or(self.config.default_temperature),
            max_tokens: req.max_tokens,
        }
    }
}

fn parse_response(text: &str) -> Result<ChatResponse, LlmError> {
    let parsed: OpenAiResponse =
        serde_json::from_str(text).map_err(|e| LlmError::Parsing(format!("{e}: {text}")))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::Parsing(format!("response has no message content: {text}")))?;
    let usage = parsed
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        })
        .unwrap_or_default();
    Ok(ChatResponse { content, usage })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.build_body(&req);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), text));
        }
        let response = parse_response(&text)?;
        debug!(
            model = %self.config.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "chat completion"
        );
        Ok(response)
    }
}
