use std::sync::Arc;

use approval_core::db::{self, ApprovalDb};
use approval_core::types::{ApprovalChainStep, ChainId, NewProject, ProjectId, StepDisplay, UserId};
use approval_core::{
    ApprovalConfig, ApprovalError, ApproveAndForwardAction, ChainCreator, ChainProgress,
    FixedClock, RoleProvider, SqliteRoleProvider, StaticRoleProvider,
};
use chrono::{DateTime, TimeZone, Utc};

const ALICE: UserId = UserId::new(11);
const BOB: UserId = UserId::new(12);
const CAROL: UserId = UserId::new(13);

fn approval_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap()
}

struct Fixture {
    db: Arc<ApprovalDb>,
    action: ApproveAndForwardAction,
    project_id: ProjectId,
    chain_id: ChainId,
}

impl Fixture {
    fn new(members: &[UserId]) -> Self {
        Self::with_config(members, ApprovalConfig::default())
    }

    fn with_config(members: &[UserId], config: ApprovalConfig) -> Self {
        let db = Arc::new(ApprovalDb::open_in_memory().unwrap());
        let clock = Arc::new(FixedClock(approval_time()));

        let project_id = db
            .with_conn(|conn| {
                let project = db::projects::insert_project(conn, &NewProject::new("Bridge", UserId::new(1), "BRG"))?;
                for user in members {
                    db::projects::add_member(conn, project.id, *user)?;
                }
                Ok(project.id)
            })
            .unwrap();

        let chain_id = ChainCreator::new(db.clone(), clock.clone())
            .create_chain(project_id)
            .unwrap()
            .id;

        let roles = StaticRoleProvider::new()
            .with_roles(ALICE, ["Admin"])
            .with_roles(BOB, ["Admin"])
            .with_roles(CAROL, ["Admin"]);

        let action = ApproveAndForwardAction::new(db.clone(), Arc::new(roles), clock, &config);

        Self { db, action, project_id, chain_id }
    }

    fn steps(&self) -> Vec<ApprovalChainStep> {
        self.db.with_conn(|conn| db::chains::list_steps(conn, self.chain_id)).unwrap()
    }

    fn status(&self) -> i64 {
        self.db
            .with_conn(|conn| db::projects::require_project(conn, self.project_id))
            .unwrap()
            .status_id
    }
}

#[test]
fn test_action_label_icon_and_color() {
    let fixture = Fixture::new(&[ALICE]);
    let step = fixture.steps().remove(0);

    assert_eq!(fixture.action.label(), "Approve");
    assert_eq!(fixture.action.icon(&step), "heroicon-o-arrow-right");
    assert_eq!(fixture.action.color(&step), "primary");

    fixture.action.approve_and_forward_step(step.id, ALICE).unwrap();
    let step = fixture.steps().remove(0);

    assert_eq!(fixture.action.icon(&step), "heroicon-o-check");
    assert_eq!(fixture.action.color(&step), "success");
}

#[test]
fn test_action_disabled_state() {
    let fixture = Fixture::new(&[ALICE, BOB]);
    let steps = fixture.steps();

    assert!(!fixture.action.is_disabled(&steps[0], ALICE).unwrap());
    assert!(fixture.action.is_disabled(&steps[0], BOB).unwrap());
    assert!(fixture.action.is_disabled(&steps[1], BOB).unwrap());

    assert_eq!(fixture.action.display_state(&steps[0], ALICE).unwrap(), StepDisplay::Actionable);
    assert_eq!(fixture.action.display_state(&steps[1], BOB).unwrap(), StepDisplay::Disabled);
}

#[test]
fn test_presentation_queries_do_not_mutate() {
    let fixture = Fixture::new(&[ALICE, BOB]);
    let before = fixture.steps();

    for step in &before {
        fixture.action.is_eligible(step, ALICE).unwrap();
        fixture.action.is_disabled(step, BOB).unwrap();
        fixture.action.display_state(step, ALICE).unwrap();
    }
    fixture.action.is_visible(ALICE).unwrap();

    assert_eq!(fixture.steps(), before);
    assert_eq!(fixture.status(), 1);
}

#[test]
fn test_action_visibility() {
    let db = Arc::new(ApprovalDb::open_in_memory().unwrap());
    let roles = Arc::new(SqliteRoleProvider::new(db.clone()));
    let action = ApproveAndForwardAction::new(
        db.clone(),
        roles.clone(),
        Arc::new(FixedClock(approval_time())),
        &ApprovalConfig::default(),
    );

    let only_default = UserId::new(1);
    let only_admin = UserId::new(2);
    let both = UserId::new(3);
    let nobody = UserId::new(4);

    db.with_conn(|conn| {
        db::roles::assign_role(conn, only_default, "Default role")?;
        db::roles::assign_role(conn, only_admin, "Admin")?;
        db::roles::assign_role(conn, both, "Default role")?;
        db::roles::assign_role(conn, both, "Admin")?;
        Ok(())
    })
    .unwrap();

    assert!(!action.is_visible(only_default).unwrap());
    assert!(action.is_visible(only_admin).unwrap());
    assert!(action.is_visible(both).unwrap());
    assert!(!action.is_visible(nobody).unwrap());
    assert_eq!(roles.roles_of(both).unwrap(), vec!["Admin".to_string(), "Default role".to_string()]);
}

#[test]
fn test_three_step_chain_advances_status_once() {
    let fixture = Fixture::new(&[ALICE, BOB, CAROL]);
    let steps = fixture.steps();
    assert_eq!(steps.iter().map(|s| s.step_order).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(steps.iter().all(|s| !s.approved));

    let first = fixture.action.approve_and_forward_step(steps[0].id, ALICE).unwrap();
    assert!(first.step.approved);
    assert_eq!(first.step.approved_at, Some(approval_time()));
    assert!(!first.chain_complete);
    assert_eq!(fixture.status(), 1);

    let second = fixture.action.approve_and_forward_step(steps[1].id, BOB).unwrap();
    assert!(!second.chain_complete);
    assert!(!second.status_advanced());
    assert_eq!(fixture.status(), 1);

    let third = fixture.action.approve_and_forward_step(steps[2].id, CAROL).unwrap();
    assert!(third.chain_complete);
    assert_eq!(third.previous_status_id, 1);
    assert_eq!(third.project_status_id, 2);
    assert_eq!(fixture.status(), 2);

    let stored = fixture.steps();
    assert!(stored.iter().all(|s| s.approved && s.approved_at == Some(approval_time())));
    assert!(ChainProgress::from_steps(&stored).is_complete());
}

#[test]
fn test_approving_one_step_leaves_others_unchanged() {
    let fixture = Fixture::new(&[ALICE, BOB, CAROL]);
    let before = fixture.steps();

    fixture.action.approve_and_forward_step(before[0].id, ALICE).unwrap();
    let after = fixture.steps();

    assert!(after[0].approved);
    assert_eq!(after[1], before[1]);
    assert_eq!(after[2], before[2]);
}

#[test]
fn test_out_of_order_approval_is_forbidden() {
    let fixture = Fixture::new(&[ALICE, BOB]);
    let steps = fixture.steps();

    let err = fixture.action.approve_and_forward_step(steps[1].id, BOB).unwrap_err();
    assert!(matches!(err, ApprovalError::Forbidden(_)), "unexpected error: {}", err);

    assert_eq!(fixture.steps(), steps);
    assert_eq!(fixture.status(), 1);
}

#[test]
fn test_wrong_user_is_forbidden() {
    let fixture = Fixture::new(&[ALICE, BOB]);
    let steps = fixture.steps();

    let err = fixture.action.approve_and_forward_step(steps[0].id, BOB).unwrap_err();
    assert!(matches!(err, ApprovalError::Forbidden(_)));
    assert_eq!(fixture.steps(), steps);
}

#[test]
fn test_reapproval_is_forbidden_and_status_bumps_once() {
    let fixture = Fixture::new(&[ALICE]);
    let step = fixture.steps().remove(0);

    fixture.action.approve_and_forward_step(step.id, ALICE).unwrap();
    assert_eq!(fixture.status(), 2);

    let err = fixture.action.approve_and_forward_step(step.id, ALICE).unwrap_err();
    assert!(matches!(err, ApprovalError::Forbidden(_)));
    assert_eq!(fixture.status(), 2);
}

#[test]
fn test_missing_step_is_not_found() {
    let fixture = Fixture::new(&[ALICE]);

    let err = fixture
        .action
        .approve_and_forward_step(approval_core::types::StepId::new(404), ALICE)
        .unwrap_err();
    assert!(matches!(err, ApprovalError::NotFound(_)));
}

#[test]
fn test_configured_completed_status() {
    let config = ApprovalConfig::from_json_str(r#"{ "workflow": { "completed_status_id": 5 } }"#).unwrap();
    let fixture = Fixture::with_config(&[ALICE, BOB], config);
    let steps = fixture.steps();

    fixture.action.approve_and_forward_step(steps[0].id, ALICE).unwrap();
    assert_eq!(fixture.status(), 1);

    let outcome = fixture.action.approve_and_forward_step(steps[1].id, BOB).unwrap();
    assert_eq!(outcome.project_status_id, 5);
    assert_eq!(fixture.status(), 5);
}

#[test]
fn test_status_without_successor_rolls_back_final_approval() {
    let fixture = Fixture::new(&[ALICE]);
    fixture
        .db
        .with_conn(|conn| db::projects::set_status(conn, fixture.project_id, i64::MAX))
        .unwrap();
    let step = fixture.steps().remove(0);

    let err = fixture.action.approve_and_forward_step(step.id, ALICE).unwrap_err();
    assert!(matches!(err, ApprovalError::Validation(_)), "unexpected error: {:?}", err);

    // Step update rolled back and the connection is still usable
    let steps = fixture.steps();
    assert!(!steps[0].approved);
    assert!(steps[0].approved_at.is_none());
    assert_eq!(fixture.status(), i64::MAX);
    assert!(fixture.action.is_eligible(&step, ALICE).unwrap());
    assert_eq!(fixture.db.stats().unwrap().step_count, 1);
}
