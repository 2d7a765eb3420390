//! Project and membership queries

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, Row};

use approval_types::{NewProject, Project, ProjectId, ProjectUser, UserId};
use crate::error::{ApprovalError, Result};

const PROJECT_COLUMNS: &str =
    "id, name, description, status_id, owner_id, ticket_prefix, status_type, type";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ProjectId::new(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        status_id: row.get(3)?,
        owner_id: UserId::new(row.get(4)?),
        ticket_prefix: row.get(5)?,
        status_type: row.get(6)?,
        project_type: row.get(7)?,
    })
}

/// Insert a project and return the stored row
pub fn insert_project(conn: &Connection, input: &NewProject) -> Result<Project> {
    if input.name.trim().is_empty() {
        return Err(ApprovalError::Validation("Project name is required".to_string()));
    }
    if input.status_id <= 0 {
        return Err(ApprovalError::Validation(format!(
            "Project status_id must be positive, got {}", input.status_id
        )));
    }

    conn.execute(
        "INSERT INTO projects (name, description, status_id, owner_id, ticket_prefix, status_type, type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            input.name,
            input.description,
            input.status_id,
            input.owner_id.value(),
            input.ticket_prefix,
            input.status_type,
            input.project_type,
        ],
    )?;

    let id = ProjectId::new(conn.last_insert_rowid());
    require_project(conn, id)
}

/// Get a project by id
pub fn get_project(conn: &Connection, id: ProjectId) -> Result<Option<Project>> {
    let sql = format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS);
    let project = conn
        .query_row(&sql, params![id.value()], project_from_row)
        .optional()?;
    Ok(project)
}

/// Get a project by id, `NotFound` if missing
pub fn require_project(conn: &Connection, id: ProjectId) -> Result<Project> {
    get_project(conn, id)?
        .ok_or_else(|| ApprovalError::NotFound(format!("Project {} does not exist", id)))
}

/// Overwrite a project's status
pub fn set_status(conn: &Connection, id: ProjectId, status_id: i64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE projects SET status_id = ?1 WHERE id = ?2",
        params![status_id, id.value()],
    )?;

    if updated == 0 {
        return Err(ApprovalError::NotFound(format!("Project {} does not exist", id)));
    }
    Ok(())
}

/// Add a user to a project
pub fn add_member(conn: &Connection, project_id: ProjectId, user_id: UserId) -> Result<ProjectUser> {
    require_project(conn, project_id)?;

    conn.execute(
        "INSERT INTO project_users (project_id, user_id) VALUES (?1, ?2)",
        params![project_id.value(), user_id.value()],
    )?;

    Ok(ProjectUser {
        id: conn.last_insert_rowid(),
        project_id,
        user_id,
    })
}

/// Membership rows of a project in insertion order
pub fn list_members(conn: &Connection, project_id: ProjectId) -> Result<Vec<ProjectUser>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, user_id FROM project_users WHERE project_id = ?1 ORDER BY id",
    )?;
    let members = stmt
        .query_map(params![project_id.value()], |row| {
            Ok(ProjectUser {
                id: row.get(0)?,
                project_id: ProjectId::new(row.get(1)?),
                user_id: UserId::new(row.get(2)?),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(members)
}

/// Distinct member user ids in the order they were first added
pub fn distinct_member_ids(conn: &Connection, project_id: ProjectId) -> Result<Vec<UserId>> {
    let members = list_members(conn, project_id)?;
    Ok(dedup_first_seen(members.iter().map(|m| m.user_id)))
}

/// Drop repeated users, keeping the position of the first occurrence
pub fn dedup_first_seen<I>(users: I) -> Vec<UserId>
where
    I: IntoIterator<Item = UserId>,
{
    let mut seen = HashSet::new();
    users.into_iter().filter(|user| seen.insert(*user)).collect()
}
