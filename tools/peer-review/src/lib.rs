//! Peer-review workflow on `stepgraph`: a developer writes code, a reviewer approves
//! or rejects it, tests are generated and reviewed, and a manager signs off.
//!
//! Every step is checkpointed under a run id, so an interrupted review (model
//! outage, Ctrl-C, step limit) can be resumed where it stopped.

pub mod approval;
pub mod config;
pub mod llm;
pub mod logging;
pub mod nodes;
pub mod review;
pub mod state;
pub mod workflow;

pub use approval::{ApprovalSource, Decision, PromptApproval, ScriptedApproval, StaticApproval};
pub use config::{Config, ConfigError};
pub use llm::{LlmClient, LlmConfig, LlmError, OpenAiClient, ScriptedLlm};
pub use nodes::Manager;
pub use review::{parse_review, ParseError, Review, ReviewStatus};
pub use workflow::{build_workflow, compile_workflow, ManagerMode, WorkflowError};
