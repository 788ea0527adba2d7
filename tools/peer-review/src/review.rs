//! Structured review verdicts and parsing of the model's review output.
//!
//! Reviewers are asked for a JSON object
//! `{"status": "Approved" | "Rejected + Feedback", "feedback": "..."}`; models often
//! wrap it in a ```json fence or add a sentence around it, both of which are accepted.

use serde::{Deserialize, Serialize};
use stepgraph::RouteKey;
use thiserror::Error;

/// Verdict of a reviewer or the manager. Also the route key of the workflow's
/// conditional edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Rejected + Feedback")]
    Rejected,
}

impl ReviewStatus {
    /// Every status name, in the form stored in state.
    pub const NAMES: [&'static str; 2] = ["Approved", "Rejected + Feedback"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Approved" => Some(ReviewStatus::Approved),
            "Rejected + Feedback" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }
}

impl RouteKey for ReviewStatus {
    fn variants() -> &'static [Self] {
        &[ReviewStatus::Approved, ReviewStatus::Rejected]
    }

    fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Approved => Self::NAMES[0],
            ReviewStatus::Rejected => Self::NAMES[1],
        }
    }
}

/// One parsed review.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Review {
    pub status: ReviewStatus,
    #[serde(default)]
    pub feedback: String,
}

/// The model's output could not be read as a review.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON object in review output: {raw:?}")]
    NoJson { raw: String },
    #[error("malformed review ({reason}): {raw:?}")]
    Malformed { reason: String, raw: String },
}

/// Appended to reviewer system prompts.
pub const REVIEW_FORMAT: &str = "Respond with a JSON object only, no other text: \
{\"status\": \"Approved\" | \"Rejected + Feedback\", \"feedback\": \"...\"}. \
Use \"Rejected + Feedback\" when anything must change and explain what in feedback.";

/// Strips an optional ```json ... ``` (or bare ```) fence, then narrows to the
/// outermost `{ ... }`.
fn extract_json(content: &str) -> Option<&str> {
    let content = content.trim();
    let unfenced = content
        .strip_prefix("```json")
        .or_else(|| content.strip_prefix("```"))
        .and_then(|s| s.trim_end().strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(content);
    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (start < end).then(|| &unfenced[start..=end])
}

/// Parses a reviewer reply into a `Review`.
pub fn parse_review(raw: &str) -> Result<Review, ParseError> {
    let json = extract_json(raw).ok_or_else(|| ParseError::NoJson {
        raw: raw.to_string(),
    })?;
    serde_json::from_str(json).map_err(|e| ParseError::Malformed {
        reason: e.to_string(),
        raw: raw.to_string(),
    })
}
