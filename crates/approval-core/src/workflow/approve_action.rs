//! Approve-and-forward action for a single approval step
//!
//! Presentation queries (`label`, `icon`, `color`, `is_disabled`,
//! `is_visible`) only read state. `approve_and_forward_step` is the single
//! mutating entry point and re-checks eligibility itself, regardless of what
//! the presentation queries reported.

use std::sync::Arc;

use rusqlite::TransactionBehavior;

use approval_types::{ApprovalChainStep, ApprovalOutcome, StepDisplay, StepId, UserId};
use crate::clock::Clock;
use crate::config::ApprovalConfig;
use crate::constants;
use crate::db::{self, ApprovalDb};
use crate::error::{ApprovalError, Result};
use super::progress;
use super::traits::RoleProvider;

pub struct ApproveAndForwardAction {
    db: Arc<ApprovalDb>,
    roles: Arc<dyn RoleProvider>,
    clock: Arc<dyn Clock>,
    baseline_role: String,
    completed_status_id: Option<i64>,
}

impl ApproveAndForwardAction {
    pub fn new(
        db: Arc<ApprovalDb>,
        roles: Arc<dyn RoleProvider>,
        clock: Arc<dyn Clock>,
        config: &ApprovalConfig,
    ) -> Self {
        Self {
            db,
            roles,
            clock,
            baseline_role: config.roles.baseline_role.clone(),
            completed_status_id: config.workflow.completed_status_id,
        }
    }

    pub fn label(&self) -> &'static str {
        constants::ACTION_LABEL
    }

    pub fn icon(&self, step: &ApprovalChainStep) -> &'static str {
        if self.is_approved(step) {
            constants::ICON_APPROVED
        } else {
            constants::ICON_PENDING
        }
    }

    pub fn color(&self, step: &ApprovalChainStep) -> &'static str {
        if self.is_approved(step) {
            constants::COLOR_APPROVED
        } else {
            constants::COLOR_PENDING
        }
    }

    pub fn is_approved(&self, step: &ApprovalChainStep) -> bool {
        step.is_approved()
    }

    /// True if `user` is assigned to `step` and it is the next pending step of its chain
    pub fn is_eligible(&self, step: &ApprovalChainStep, user: UserId) -> Result<bool> {
        let (current, siblings) = self.load_with_siblings(step.id)?;
        Ok(progress::is_eligible(&current, user, &siblings))
    }

    pub fn is_disabled(&self, step: &ApprovalChainStep, user: UserId) -> Result<bool> {
        Ok(!self.is_eligible(step, user)?)
    }

    /// Users whose only role is the baseline role never see the action
    pub fn is_visible(&self, user: UserId) -> Result<bool> {
        self.roles.user_has_any_role_except(user, &self.baseline_role)
    }

    pub fn display_state(&self, step: &ApprovalChainStep, user: UserId) -> Result<StepDisplay> {
        let (current, siblings) = self.load_with_siblings(step.id)?;
        Ok(progress::display_state(&current, user, &siblings))
    }

    /// Approve `step_id` on behalf of `user` and advance the project status
    /// once every step of the chain is approved.
    ///
    /// The eligibility check, the step update and the status change run in a
    /// single immediate transaction, so two racing approvals cannot both pass
    /// the check and the status advances at most once per chain.
    pub fn approve_and_forward_step(&self, step_id: StepId, user: UserId) -> Result<ApprovalOutcome> {
        let now = self.clock.now();
        let completed_status_id = self.completed_status_id;

        let outcome = self.db.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let step = db::chains::require_step(&tx, step_id)?;
            let chain = db::chains::require_chain(&tx, step.approval_chain_id)?;
            let siblings = db::chains::list_steps(&tx, chain.id)?;

            if step.user_id != user {
                return Err(ApprovalError::Forbidden(format!(
                    "Step {} is assigned to user {}, not user {}", step.id, step.user_id, user
                )));
            }
            if step.approved {
                return Err(ApprovalError::Forbidden(format!(
                    "Step {} is already approved", step.id
                )));
            }
            if !progress::is_next_pending(&step, &siblings) {
                return Err(ApprovalError::Forbidden(format!(
                    "Step {} (order {}) is waiting on earlier steps", step.id, step.step_order
                )));
            }

            if !db::chains::mark_step_approved(&tx, step.id, now)? {
                return Err(ApprovalError::Forbidden(format!(
                    "Step {} was approved concurrently", step.id
                )));
            }

            let approved_step = ApprovalChainStep {
                approved: true,
                approved_at: Some(now),
                ..step
            };

            let chain_complete = siblings
                .iter()
                .all(|other| other.id == approved_step.id || other.approved);

            let project = db::projects::require_project(&tx, chain.project_id)?;
            let previous_status_id = project.status_id;
            let mut project_status_id = previous_status_id;

            if chain_complete {
                match progress::next_status(previous_status_id, completed_status_id)? {
                    Some(next) => {
                        db::projects::set_status(&tx, project.id, next)?;
                        project_status_id = next;
                    }
                    None => log::warn!(
                        "Chain {} complete but project {} is already at status {}",
                        chain.id, project.id, previous_status_id
                    ),
                }
            }

            tx.commit()?;

            Ok(ApprovalOutcome {
                step: approved_step,
                chain_complete,
                previous_status_id,
                project_status_id,
            })
        });

        match &outcome {
            Ok(result) => {
                log::info!(
                    "User {} approved step {} (order {})",
                    user, result.step.id, result.step.step_order
                );
                if result.status_advanced() {
                    log::info!(
                        "Approval chain {} complete, project status {} -> {}",
                        result.step.approval_chain_id, result.previous_status_id, result.project_status_id
                    );
                }
            }
            Err(ApprovalError::Forbidden(reason)) => {
                log::warn!("Rejected approval of step {} by user {}: {}", step_id, user, reason);
            }
            Err(_) => {}
        }

        outcome
    }

    /// Fresh copy of a step together with every step of its chain
    fn load_with_siblings(&self, step_id: StepId) -> Result<(ApprovalChainStep, Vec<ApprovalChainStep>)> {
        self.db.with_conn(|conn| {
            let step = db::chains::require_step(conn, step_id)?;
            let siblings = db::chains::list_steps(conn, step.approval_chain_id)?;
            Ok((step, siblings))
        })
    }
}
