//! Pure chain-state rules shared by the action and the admin views

use serde::Serialize;

use approval_types::{ApprovalChainStep, ChainState, StepDisplay, StepId, UserId};
use crate::error::{ApprovalError, Result};

/// The pending step with the lowest order, if any
pub fn next_pending(steps: &[ApprovalChainStep]) -> Option<&ApprovalChainStep> {
    steps
        .iter()
        .filter(|step| !step.approved)
        .min_by_key(|step| step.step_order)
}

/// True if `step` is unapproved and every lower-ordered step of its chain is approved.
/// `chain_steps` must be the full step list of the step's chain.
pub fn is_next_pending(step: &ApprovalChainStep, chain_steps: &[ApprovalChainStep]) -> bool {
    !step.approved
        && chain_steps
            .iter()
            .filter(|other| other.step_order < step.step_order)
            .all(|other| other.approved)
}

/// True if `user` may approve `step` right now
pub fn is_eligible(step: &ApprovalChainStep, user: UserId, chain_steps: &[ApprovalChainStep]) -> bool {
    step.user_id == user && is_next_pending(step, chain_steps)
}

/// Presentation state of a step for the acting user
pub fn display_state(step: &ApprovalChainStep, user: UserId, chain_steps: &[ApprovalChainStep]) -> StepDisplay {
    if step.approved {
        StepDisplay::Completed
    } else if is_eligible(step, user, chain_steps) {
        StepDisplay::Actionable
    } else {
        StepDisplay::Disabled
    }
}

/// Status a project moves to when its chain completes. `None` means no
/// change, which happens only when the configured target would not move
/// the status forward. A status with no successor is a `Validation` error.
pub fn next_status(current: i64, completed_status_id: Option<i64>) -> Result<Option<i64>> {
    match completed_status_id {
        None => current.checked_add(1).map(Some).ok_or_else(|| {
            ApprovalError::Validation(format!("Project status {} cannot be advanced", current))
        }),
        Some(target) if target > current => Ok(Some(target)),
        Some(_) => Ok(None),
    }
}

/// Derived progress summary of a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainProgress {
    pub total_steps: usize,
    pub approved_steps: usize,
    pub next_step: Option<StepId>,
    pub next_user: Option<UserId>,
    pub state: ChainState,
}

impl ChainProgress {
    pub fn from_steps(steps: &[ApprovalChainStep]) -> Self {
        let approved_steps = steps.iter().filter(|step| step.approved).count();
        let next = next_pending(steps);

        Self {
            total_steps: steps.len(),
            approved_steps,
            next_step: next.map(|step| step.id),
            next_user: next.map(|step| step.user_id),
            state: if next.is_some() { ChainState::InProgress } else { ChainState::Complete },
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == ChainState::Complete
    }
}
