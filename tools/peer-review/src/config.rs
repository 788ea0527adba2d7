//! Configuration: TOML file, environment overrides, and the resolved LLM settings.
//!
//! **Interaction**: Used by `main` to build the LLM client, pick the manager mode and
//! open the checkpoint database. Resolution order: defaults < file < environment <
//! CLI flags (applied by `main`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::llm::LlmConfig;
use crate::workflow::ManagerMode;

pub const DEFAULT_CONFIG_FILE: &str = "peer-review.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration value `{0}` (set it in the config file or the environment)")]
    MissingKey(&'static str),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub workflow: WorkflowSection,
    pub checkpoint: CheckpointSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: crate::llm::DEFAULT_BASE_URL.to_string(),
            model: crate::llm::DEFAULT_MODEL.to_string(),
            temperature: Some(0.3),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowSection {
    pub manager: ManagerMode,
    /// Gate mode only: approve without asking.
    pub auto_approve: bool,
    /// Review rounds are unbounded otherwise.
    pub max_steps: Option<u64>,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            manager: ManagerMode::default(),
            auto_approve: false,
            max_steps: Some(50),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckpointSection {
    pub path: PathBuf,
}

impl Default for CheckpointSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("peer-review.db"),
        }
    }
}

impl Config {
    /// Parses a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parse config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid TOML config")
    }

    /// Loads `path` if given (it must exist), else `peer-review.toml` when present,
    /// else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Overlays `OPENAI_API_KEY` (or `GROQ_API_KEY`), `OPENAI_API_BASE` and
    /// `OPENAI_MODEL` from the process environment. Call `dotenv::dotenv()` first to
    /// pick up a `.env` file.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// `apply_env` with an injectable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(key) = get("OPENAI_API_KEY").or_else(|| get("GROQ_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(base) = get("OPENAI_API_BASE") {
            self.llm.api_base = base;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.llm.model = model;
        }
    }

    /// Settings for `OpenAiClient`; fails if no API key was configured.
    pub fn llm_config(&self) -> Result<LlmConfig, ConfigError> {
        let api_key = self
            .llm
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingKey("llm.api_key"))?;
        Ok(LlmConfig {
            api_key: api_key.to_string(),
            base_url: self.llm.api_base.clone(),
            model: self.llm.model.clone(),
            default_temperature: self.llm.temperature,
            timeout: Duration::from_secs(self.llm.timeout_secs),
        })
    }
}
