//! Shared types for the project approval chain
//! No string-based state management - ids and states are strongly typed

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Row id in `projects`
    ProjectId
);
row_id!(
    /// User reference (users live outside this system)
    UserId
);
row_id!(
    /// Row id in `approval_chains`
    ChainId
);
row_id!(
    /// Row id in `approval_chain_steps`
    StepId
);

/// Project row - the subject of an approval chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub status_id: i64,
    pub owner_id: UserId,
    pub ticket_prefix: String,
    pub status_type: String,
    #[serde(rename = "type")]
    pub project_type: String,
}

/// Input for registering a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_status_id")]
    pub status_id: i64,
    pub owner_id: UserId,
    pub ticket_prefix: String,
    #[serde(default = "default_status_type")]
    pub status_type: String,
    #[serde(rename = "type", default = "default_project_type")]
    pub project_type: String,
}

fn default_status_id() -> i64 {
    1
}

fn default_status_type() -> String {
    "default".to_string()
}

fn default_project_type() -> String {
    "project".to_string()
}

impl NewProject {
    /// Project with default status, status type and type
    pub fn new(name: impl Into<String>, owner_id: UserId, ticket_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            status_id: default_status_id(),
            owner_id,
            ticket_prefix: ticket_prefix.into(),
            status_type: default_status_type(),
            project_type: default_project_type(),
        }
    }
}

/// Membership of a user in a project. A user may be listed more than once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectUser {
    pub id: i64,
    pub project_id: ProjectId,
    pub user_id: UserId,
}

/// One chain per project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalChain {
    pub id: ChainId,
    pub project_id: ProjectId,
    pub created_at: DateTime<Utc>,
}

/// A single approval step, owned by its chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalChainStep {
    pub id: StepId,
    pub approval_chain_id: ChainId,
    pub user_id: UserId,
    /// 1-based, contiguous within the chain
    pub step_order: i64,
    pub approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
}

impl ApprovalChainStep {
    pub fn is_approved(&self) -> bool {
        self.approved
    }
}

/// Derived chain state, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainState {
    InProgress,
    Complete,
}

/// How an approval step is presented to the acting user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepDisplay {
    /// Eligible and waiting for this user
    Actionable,
    /// Already approved
    Completed,
    /// Someone else's step, or predecessors still pending
    Disabled,
}

/// Result of a successful approve-and-forward
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub step: ApprovalChainStep,
    pub chain_complete: bool,
    pub previous_status_id: i64,
    pub project_status_id: i64,
}

impl ApprovalOutcome {
    pub fn status_advanced(&self) -> bool {
        self.project_status_id != self.previous_status_id
    }
}
