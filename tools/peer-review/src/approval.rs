//! Manager approval: the external signal that gates deployment.
//!
//! The manager node does not decide by itself; it asks an `ApprovalSource`. The
//! binary uses `StaticApproval` (`--approve`) or `PromptApproval` (asks on stdin).

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use stepgraph::State;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};

use crate::state::{SOURCE_CODE, TEST_CASES, TOPIC};

/// Manager decision for one approval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { feedback: String },
}

impl Decision {
    pub fn reject(feedback: impl Into<String>) -> Self {
        Decision::Reject {
            feedback: feedback.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("approval input: {0}")]
    Io(#[from] std::io::Error),
    #[error("approval input closed before a decision was made")]
    Closed,
    #[error("no scripted decision left")]
    Exhausted,
}

/// Source of manager decisions.
///
/// **Interaction**: Held by `ManagerNode` in gate mode; asked once per visit of the
/// manager node with the state reviewed so far.
#[async_trait]
pub trait ApprovalSource: Send + Sync {
    async fn decide(&self, state: &State) -> Result<Decision, ApprovalError>;
}

/// Always returns the same decision.
#[derive(Debug, Clone)]
pub struct StaticApproval {
    decision: Decision,
}

impl StaticApproval {
    pub fn approve() -> Self {
        Self {
            decision: Decision::Approve,
        }
    }

    pub fn reject(feedback: impl Into<String>) -> Self {
        Self {
            decision: Decision::reject(feedback),
        }
    }
}

#[async_trait]
impl ApprovalSource for StaticApproval {
    async fn decide(&self, _state: &State) -> Result<Decision, ApprovalError> {
        Ok(self.decision.clone())
    }
}

/// Returns queued decisions in order; fails with `Exhausted` when none are left.
#[derive(Debug, Default)]
pub struct ScriptedApproval {
    decisions: Mutex<VecDeque<Decision>>,
}

impl ScriptedApproval {
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ApprovalSource for ScriptedApproval {
    async fn decide(&self, _state: &State) -> Result<Decision, ApprovalError> {
        let next = self
            .decisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.ok_or(ApprovalError::Exhausted)
    }
}

type AnswerLines = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Asks a human on the terminal: prints the code and tests, reads one line.
///
/// `y`/`yes`/`approve` approves; any other non-empty answer rejects with the answer
/// as feedback. One reader is kept for the whole run, so answers piped in ahead of
/// time are consumed one decision at a time.
pub struct PromptApproval {
    answers: tokio::sync::Mutex<AnswerLines>,
}

impl PromptApproval {
    /// Reads answers from stdin.
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
        Self {
            answers: tokio::sync::Mutex::new(reader.lines()),
        }
    }
}

impl Default for PromptApproval {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads an answer line into a decision; `None` for a blank line.
fn interpret(answer: &str) -> Option<Decision> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" | "approve" | "approved" => Some(Decision::Approve),
        _ => Some(Decision::reject(answer)),
    }
}

#[async_trait]
impl ApprovalSource for PromptApproval {
    async fn decide(&self, state: &State) -> Result<Decision, ApprovalError> {
        let mut out = tokio::io::stderr();
        let summary = format!(
            "\n=== Manager approval: {} ===\n--- code ---\n{}\n--- tests ---\n{}\n",
            state.get_str(TOPIC).unwrap_or("(no topic)"),
            state.get_str(SOURCE_CODE).unwrap_or("(none)"),
            state.get_str(TEST_CASES).unwrap_or("(none)"),
        );
        let mut lines = self.answers.lock().await;
        out.write_all(summary.as_bytes()).await?;

        loop {
            out.write_all(b"Approve for deployment? [yes / feedback to reject]: ")
                .await?;
            out.flush().await?;
            let line = lines.next_line().await?.ok_or(ApprovalError::Closed)?;
            if let Some(decision) = interpret(&line) {
                return Ok(decision);
            }
        }
    }
}
