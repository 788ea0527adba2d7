//! Workflow state: field names and the schema every step is checked against.

use stepgraph::{PartialState, StateSchema};

use crate::review::ReviewStatus;

pub const TOPIC: &str = "topic";
pub const SOURCE_CODE: &str = "source_code";
pub const CODE_REVIEW_STATUS: &str = "code_review_status";
pub const TEST_CASES: &str = "test_cases";
pub const TEST_CASE_REVIEW_STATUS: &str = "test_case_review_status";
pub const MANAGER_APPROVAL_STATUS: &str = "manager_approval_status";
pub const FEEDBACK: &str = "feedback";
pub const FINAL_CODE_VERSION: &str = "final_code_version";
pub const DEPLOYMENT_STATUS: &str = "deployment_status";

/// Value of `deployment_status` once the manager approved.
pub const LIVE: &str = "LIVE";

/// Schema of the peer-review state. Every field starts absent except `topic`.
pub fn schema() -> StateSchema {
    StateSchema::builder()
        .text(TOPIC)
        .text(SOURCE_CODE)
        .enumeration(CODE_REVIEW_STATUS, ReviewStatus::NAMES)
        .text(TEST_CASES)
        .enumeration(TEST_CASE_REVIEW_STATUS, ReviewStatus::NAMES)
        .enumeration(MANAGER_APPROVAL_STATUS, ReviewStatus::NAMES)
        .text(FEEDBACK)
        .text(FINAL_CODE_VERSION)
        .enumeration(DEPLOYMENT_STATUS, [LIVE])
        .build()
}

/// Initial values of a run.
pub fn initial(topic: impl Into<String>) -> PartialState {
    PartialState::new().set(TOPIC, topic.into())
}
