//! User role storage

use rusqlite::{params, Connection};

use approval_types::UserId;
use crate::error::{ApprovalError, Result};

/// Grant a role. Granting a role twice is a no-op.
pub fn assign_role(conn: &Connection, user_id: UserId, role_name: &str) -> Result<()> {
    if role_name.trim().is_empty() {
        return Err(ApprovalError::Validation("Role name is required".to_string()));
    }

    conn.execute(
        "INSERT OR IGNORE INTO user_roles (user_id, role_name) VALUES (?1, ?2)",
        params![user_id.value(), role_name],
    )?;
    Ok(())
}

/// Role names held by a user, sorted
pub fn roles_of(conn: &Connection, user_id: UserId) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT role_name FROM user_roles WHERE user_id = ?1 ORDER BY role_name",
    )?;
    let roles = stmt
        .query_map(params![user_id.value()], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(roles)
}
