//! Manager: final sign-off before deployment.

use std::sync::Arc;

use async_trait::async_trait;
use stepgraph::{Node, PartialState, RouteKey, State, StepError};
use tracing::info;

use crate::approval::{ApprovalSource, Decision};
use crate::review::ReviewStatus;
use crate::state::{
    DEPLOYMENT_STATUS, FEEDBACK, FINAL_CODE_VERSION, LIVE, MANAGER_APPROVAL_STATUS, SOURCE_CODE,
};

/// How the manager step behaves.
#[derive(Clone)]
pub enum Manager {
    /// Clears the approval status and feedback and lets the run end; nothing is deployed.
    Passthrough,
    /// Asks the approval source. Approval deploys the current code; rejection sends
    /// the feedback back to the developer.
    Gate(Arc<dyn ApprovalSource>),
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Manager::Passthrough => f.write_str("Passthrough"),
            Manager::Gate(_) => f.write_str("Gate(..)"),
        }
    }
}

pub struct ManagerNode {
    manager: Manager,
}

impl ManagerNode {
    pub fn new(manager: Manager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Node for ManagerNode {
    async fn run(&self, state: &State) -> Result<PartialState, StepError> {
        let source = match &self.manager {
            Manager::Passthrough => {
                return Ok(PartialState::new()
                    .clear(MANAGER_APPROVAL_STATUS)
                    .clear(FEEDBACK))
            }
            Manager::Gate(source) => source,
        };

        match source.decide(state).await.map_err(StepError::collaborator)? {
            Decision::Approve => {
                let code = state
                    .get_str(SOURCE_CODE)
                    .ok_or_else(|| StepError::failed("nothing to deploy: `source_code` is absent"))?;
                info!(chars = code.len(), "manager approved deployment");
                Ok(PartialState::new()
                    .set(MANAGER_APPROVAL_STATUS, ReviewStatus::Approved.as_str())
                    .clear(FEEDBACK)
                    .set(FINAL_CODE_VERSION, code)
                    .set(DEPLOYMENT_STATUS, LIVE))
            }
            Decision::Reject { feedback } => {
                info!(feedback = %feedback, "manager rejected");
                Ok(PartialState::new()
                    .set(MANAGER_APPROVAL_STATUS, ReviewStatus::Rejected.as_str())
                    .set(FEEDBACK, feedback))
            }
        }
    }
}
