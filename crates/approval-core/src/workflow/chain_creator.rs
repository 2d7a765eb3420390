//! Creates an approval chain with one ordered step per distinct project member

use std::sync::Arc;

use rusqlite::TransactionBehavior;
use serde_json::Value;

use approval_types::{ApprovalChain, ProjectId};
use crate::clock::Clock;
use crate::db::{self, ApprovalDb};
use crate::error::{ApprovalError, Result};

pub struct ChainCreator {
    db: Arc<ApprovalDb>,
    clock: Arc<dyn Clock>,
}

impl ChainCreator {
    pub fn new(db: Arc<ApprovalDb>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Record-creation hook for submitted form data of the shape `{"project_id": 1}`.
    /// Malformed data is rejected before anything is written.
    pub fn handle_record_creation(&self, data: &Value) -> Result<ApprovalChain> {
        let project_id = parse_project_id(data)?;
        self.create_chain(project_id)
    }

    /// Create the chain and all of its steps in one transaction.
    ///
    /// The transaction takes the write lock up front, so the existing-chain
    /// check and the insert cannot interleave with another creator.
    ///
    /// Steps follow the first-seen order of members in `project_users`; a user
    /// listed several times gets a single step. A project without members gets
    /// a chain with no steps.
    pub fn create_chain(&self, project_id: ProjectId) -> Result<ApprovalChain> {
        let now = self.clock.now();

        let (chain, step_count) = self.db.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            db::projects::require_project(&tx, project_id)?;

            if let Some(existing) = db::chains::get_chain_for_project(&tx, project_id)? {
                return Err(ApprovalError::Validation(format!(
                    "Project {} already has approval chain {}", project_id, existing.id
                )));
            }

            let chain = db::chains::insert_chain(&tx, project_id, now)?;

            let users = db::projects::distinct_member_ids(&tx, project_id)?;
            for (index, user_id) in users.iter().enumerate() {
                db::chains::insert_step(&tx, chain.id, *user_id, index as i64 + 1)?;
            }

            tx.commit()?;
            Ok((chain, users.len()))
        })?;

        log::info!(
            "Created approval chain {} for project {} with {} steps",
            chain.id, project_id, step_count
        );
        Ok(chain)
    }
}

fn parse_project_id(data: &Value) -> Result<ProjectId> {
    let raw = data
        .get("project_id")
        .ok_or_else(|| ApprovalError::Validation("project_id is required".to_string()))?;

    let id = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match id {
        Some(id) if id > 0 => Ok(ProjectId::new(id)),
        _ => Err(ApprovalError::Validation(format!(
            "project_id must be a positive integer, got {}", raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_project_id() {
        assert_eq!(parse_project_id(&json!({"project_id": 4})).unwrap(), ProjectId::new(4));
        assert_eq!(parse_project_id(&json!({"project_id": " 12 "})).unwrap(), ProjectId::new(12));
    }

    #[test]
    fn test_parse_project_id_rejects_malformed_input() {
        for data in [
            json!({}),
            json!({"project_id": null}),
            json!({"project_id": 0}),
            json!({"project_id": -3}),
            json!({"project_id": 1.5}),
            json!({"project_id": "abc"}),
        ] {
            let err = parse_project_id(&data).unwrap_err();
            assert!(matches!(err, ApprovalError::Validation(_)), "unexpected error for {}", data);
        }
    }
}
