//! Subcommand handlers. Each returns the JSON document printed on stdout.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use serde::Serialize;
use serde_json::{json, Value};

use approval_core::db::{self, ApprovalDb};
use approval_core::{
    ApprovalConfig, ApproveAndForwardAction, ChainCreator, ChainProgress, RoleProvider,
    SqliteRoleProvider, SystemClock,
};
use approval_types::{
    ApprovalChain, ApprovalChainStep, NewProject, Project, ProjectId, StepDisplay, StepId, UserId,
};

/// Step row plus how the approve action renders it for one user
#[derive(Debug, Serialize)]
struct StepView {
    #[serde(flatten)]
    step: ApprovalChainStep,
    label: &'static str,
    icon: &'static str,
    color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display: Option<StepDisplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disabled: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ChainView {
    chain: ApprovalChain,
    project: Project,
    progress: ChainProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    action_visible: Option<bool>,
    steps: Vec<StepView>,
}

pub struct AdminApp {
    db: Arc<ApprovalDb>,
    roles: Arc<SqliteRoleProvider>,
    creator: ChainCreator,
    action: ApproveAndForwardAction,
}

impl AdminApp {
    /// Open the configured database file
    pub fn open(config: &ApprovalConfig) -> Result<Self> {
        let db = ApprovalDb::open(&config.database.path)
            .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;
        Ok(Self::with_db(Arc::new(db), config))
    }

    pub fn with_db(db: Arc<ApprovalDb>, config: &ApprovalConfig) -> Self {
        let clock = Arc::new(SystemClock);
        let roles = Arc::new(SqliteRoleProvider::new(db.clone()));

        Self {
            creator: ChainCreator::new(db.clone(), clock.clone()),
            action: ApproveAndForwardAction::new(db.clone(), roles.clone(), clock, config),
            roles,
            db,
        }
    }

    pub fn run(&self, matches: &ArgMatches) -> Result<Value> {
        match matches.subcommand() {
            Some(("init", _)) => Ok(serde_json::to_value(self.db.stats()?)?),
            Some(("add-project", args)) => self.add_project(args),
            Some(("add-member", args)) => self.add_member(args),
            Some(("assign-role", args)) => self.assign_role(args),
            Some(("create-chain", args)) => self.create_chain(args),
            Some(("approve", args)) => self.approve(args),
            Some(("show-chain", args)) => self.show_chain(args),
            Some(("list-chains", args)) => self.list_chains(args),
            Some((other, _)) => bail!("Unknown command: {}", other),
            None => bail!("No command given"),
        }
    }

    fn add_project(&self, args: &ArgMatches) -> Result<Value> {
        let input = NewProject {
            name: string_arg(args, "name")?,
            description: string_arg(args, "description")?,
            status_id: id_arg(args, "status-id")?,
            owner_id: UserId::new(id_arg(args, "owner")?),
            ticket_prefix: string_arg(args, "ticket-prefix")?,
            status_type: string_arg(args, "status-type")?,
            project_type: string_arg(args, "type")?,
        };

        let project = self.db.with_conn(|conn| db::projects::insert_project(conn, &input))?;
        log::info!("Registered project {} ({})", project.id, project.name);
        Ok(serde_json::to_value(project)?)
    }

    fn add_member(&self, args: &ArgMatches) -> Result<Value> {
        let project_id = ProjectId::new(id_arg(args, "project")?);
        let user_id = UserId::new(id_arg(args, "user")?);

        let member = self.db.with_conn(|conn| db::projects::add_member(conn, project_id, user_id))?;
        Ok(serde_json::to_value(member)?)
    }

    fn assign_role(&self, args: &ArgMatches) -> Result<Value> {
        let user_id = UserId::new(id_arg(args, "user")?);
        let role = string_arg(args, "role")?;

        self.db.with_conn(|conn| db::roles::assign_role(conn, user_id, &role))?;
        let roles = self.roles.roles_of(user_id)?;
        Ok(json!({ "user_id": user_id, "roles": roles }))
    }

    fn create_chain(&self, args: &ArgMatches) -> Result<Value> {
        let data = json!({ "project_id": id_arg(args, "project")? });
        let chain = self.creator.handle_record_creation(&data)?;
        let steps = self.db.with_conn(|conn| db::chains::list_steps(conn, chain.id))?;
        Ok(json!({ "chain": chain, "steps": steps }))
    }

    fn approve(&self, args: &ArgMatches) -> Result<Value> {
        let step_id = StepId::new(id_arg(args, "step")?);
        let user = UserId::new(id_arg(args, "user")?);

        if !self.action.is_visible(user)? {
            bail!("The approve action is not available to user {}", user);
        }

        let outcome = self.action.approve_and_forward_step(step_id, user)?;
        Ok(serde_json::to_value(outcome)?)
    }

    fn show_chain(&self, args: &ArgMatches) -> Result<Value> {
        let project_id = ProjectId::new(id_arg(args, "project")?);
        let viewer = args.get_one::<i64>("user").copied().map(UserId::new);

        let (chain, project, steps) = self.db.with_conn(|conn| {
            let project = db::projects::require_project(conn, project_id)?;
            let chain = db::chains::get_chain_for_project(conn, project_id)?.ok_or_else(|| {
                approval_core::ApprovalError::NotFound(format!(
                    "Project {} has no approval chain", project_id
                ))
            })?;
            let steps = db::chains::list_steps(conn, chain.id)?;
            Ok((chain, project, steps))
        })?;

        let action_visible = viewer.map(|user| self.action.is_visible(user)).transpose()?;

        let views = steps
            .iter()
            .map(|step| -> Result<StepView> {
                let (display, disabled) = match viewer {
                    Some(user) => (
                        Some(self.action.display_state(step, user)?),
                        Some(self.action.is_disabled(step, user)?),
                    ),
                    None => (None, None),
                };
                Ok(StepView {
                    step: step.clone(),
                    label: self.action.label(),
                    icon: self.action.icon(step),
                    color: self.action.color(step),
                    display,
                    disabled,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let view = ChainView {
            progress: ChainProgress::from_steps(&steps),
            chain,
            project,
            action_visible,
            steps: views,
        };
        Ok(serde_json::to_value(view)?)
    }

    fn list_chains(&self, args: &ArgMatches) -> Result<Value> {
        let pending_only = args.get_flag("pending");

        let rows = self.db.with_conn(|conn| {
            let mut rows = Vec::new();
            for chain in db::chains::list_chains(conn)? {
                let steps = db::chains::list_steps(conn, chain.id)?;
                rows.push((chain, ChainProgress::from_steps(&steps)));
            }
            Ok(rows)
        })?;

        let listed: Vec<Value> = rows
            .into_iter()
            .filter(|(_, progress)| !pending_only || !progress.is_complete())
            .map(|(chain, progress)| json!({ "chain": chain, "progress": progress }))
            .collect();

        Ok(Value::Array(listed))
    }
}

fn id_arg(args: &ArgMatches, name: &str) -> Result<i64> {
    args.get_one::<i64>(name)
        .copied()
        .with_context(|| format!("--{} is required", name))
}

fn string_arg(args: &ArgMatches, name: &str) -> Result<String> {
    args.get_one::<String>(name)
        .cloned()
        .with_context(|| format!("--{} is required", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::cli;

    fn app() -> AdminApp {
        let db = Arc::new(ApprovalDb::open_in_memory().unwrap());
        AdminApp::with_db(db, &ApprovalConfig::default())
    }

    fn run(app: &AdminApp, args: &[&str]) -> Result<Value> {
        let matches = cli().try_get_matches_from(std::iter::once("approval-admin").chain(args.iter().copied()))?;
        app.run(&matches)
    }

    #[test]
    fn test_full_approval_flow() {
        let app = app();

        let project = run(&app, &["add-project", "--name", "Bridge", "--owner", "1", "--ticket-prefix", "BRG"]).unwrap();
        assert_eq!(project["status_id"], 1);
        assert_eq!(project["type"], "project");

        for user in ["11", "12"] {
            run(&app, &["add-member", "--project", "1", "--user", user]).unwrap();
            run(&app, &["assign-role", "--user", user, "--role", "Admin"]).unwrap();
        }

        let created = run(&app, &["create-chain", "--project", "1"]).unwrap();
        let steps = created["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0]["step_order"], 1);
        assert_eq!(steps[1]["user_id"], 12);

        let view = run(&app, &["show-chain", "--project", "1", "--user", "12"]).unwrap();
        assert_eq!(view["action_visible"], true);
        assert_eq!(view["steps"][1]["display"], "Disabled");
        assert_eq!(view["steps"][1]["disabled"], true);

        let first = run(&app, &["approve", "--step", "1", "--user", "11"]).unwrap();
        assert_eq!(first["chain_complete"], false);

        let pending = run(&app, &["list-chains", "--pending"]).unwrap();
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let second = run(&app, &["approve", "--step", "2", "--user", "12"]).unwrap();
        assert_eq!(second["chain_complete"], true);
        assert_eq!(second["project_status_id"], 2);

        let view = run(&app, &["show-chain", "--project", "1"]).unwrap();
        assert_eq!(view["progress"]["state"], "Complete");
        assert_eq!(view["steps"][0]["icon"], "heroicon-o-check");
        assert!(view["steps"][0].get("display").is_none());

        let pending = run(&app, &["list-chains", "--pending"]).unwrap();
        assert!(pending.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_baseline_user_cannot_approve() {
        let app = app();
        run(&app, &["add-project", "--name", "Bridge", "--owner", "1", "--ticket-prefix", "BRG"]).unwrap();
        run(&app, &["add-member", "--project", "1", "--user", "5"]).unwrap();
        run(&app, &["assign-role", "--user", "5", "--role", "Default role"]).unwrap();
        run(&app, &["create-chain", "--project", "1"]).unwrap();

        assert!(run(&app, &["approve", "--step", "1", "--user", "5"]).is_err());

        let view = run(&app, &["show-chain", "--project", "1"]).unwrap();
        assert_eq!(view["steps"][0]["approved"], false);
    }

    #[test]
    fn test_show_chain_without_chain_fails() {
        let app = app();
        run(&app, &["add-project", "--name", "Bridge", "--owner", "1", "--ticket-prefix", "BRG"]).unwrap();
        assert!(run(&app, &["show-chain", "--project", "1"]).is_err());
    }
}
