//! Role capability used to gate the approve action
//!
//! The approval workflow never reads role storage directly. It asks an
//! injected `RoleProvider`, so tests and embedders can supply roles from
//! wherever they live.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use approval_types::UserId;
use crate::db::{self, ApprovalDb};
use crate::error::Result;

pub trait RoleProvider: Send + Sync {
    /// Role names held by a user
    fn roles_of(&self, user: UserId) -> Result<Vec<String>>;

    /// True if the user holds at least one role other than `baseline_role`.
    /// A user with no roles at all has no elevated role either.
    fn user_has_any_role_except(&self, user: UserId, baseline_role: &str) -> Result<bool> {
        Ok(self.roles_of(user)?.iter().any(|role| role != baseline_role))
    }
}

/// In-memory role assignments
#[derive(Debug, Clone, Default)]
pub struct StaticRoleProvider {
    roles: HashMap<UserId, BTreeSet<String>>,
}

impl StaticRoleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles<I, S>(mut self, user: UserId, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for role in roles {
            self.assign(user, role);
        }
        self
    }

    pub fn assign(&mut self, user: UserId, role: impl Into<String>) {
        self.roles.entry(user).or_default().insert(role.into());
    }
}

impl RoleProvider for StaticRoleProvider {
    fn roles_of(&self, user: UserId) -> Result<Vec<String>> {
        Ok(self
            .roles
            .get(&user)
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default())
    }
}

/// Roles read from the `user_roles` table
pub struct SqliteRoleProvider {
    db: Arc<ApprovalDb>,
}

impl SqliteRoleProvider {
    pub fn new(db: Arc<ApprovalDb>) -> Self {
        Self { db }
    }
}

impl RoleProvider for SqliteRoleProvider {
    fn roles_of(&self, user: UserId) -> Result<Vec<String>> {
        self.db.with_conn(|conn| db::roles::roles_of(conn, user))
    }
}
