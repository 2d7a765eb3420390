//! Approval chain and step queries

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use approval_types::{ApprovalChain, ApprovalChainStep, ChainId, ProjectId, StepId, UserId};
use crate::error::{ApprovalError, Result};

const STEP_COLUMNS: &str = "id, approval_chain_id, user_id, step_order, approved, approved_at";

fn chain_from_row(row: &Row<'_>) -> rusqlite::Result<ApprovalChain> {
    Ok(ApprovalChain {
        id: ChainId::new(row.get(0)?),
        project_id: ProjectId::new(row.get(1)?),
        created_at: row.get(2)?,
    })
}

fn step_from_row(row: &Row<'_>) -> rusqlite::Result<ApprovalChainStep> {
    Ok(ApprovalChainStep {
        id: StepId::new(row.get(0)?),
        approval_chain_id: ChainId::new(row.get(1)?),
        user_id: UserId::new(row.get(2)?),
        step_order: row.get(3)?,
        approved: row.get(4)?,
        approved_at: row.get(5)?,
    })
}

/// Insert a chain row for a project
pub fn insert_chain(
    conn: &Connection,
    project_id: ProjectId,
    created_at: DateTime<Utc>,
) -> Result<ApprovalChain> {
    conn.execute(
        "INSERT INTO approval_chains (project_id, created_at) VALUES (?1, ?2)",
        params![project_id.value(), created_at],
    )?;

    Ok(ApprovalChain {
        id: ChainId::new(conn.last_insert_rowid()),
        project_id,
        created_at,
    })
}

/// Get a chain by id
pub fn get_chain(conn: &Connection, id: ChainId) -> Result<Option<ApprovalChain>> {
    let chain = conn
        .query_row(
            "SELECT id, project_id, created_at FROM approval_chains WHERE id = ?1",
            params![id.value()],
            chain_from_row,
        )
        .optional()?;
    Ok(chain)
}

/// Get a chain by id, `NotFound` if missing
pub fn require_chain(conn: &Connection, id: ChainId) -> Result<ApprovalChain> {
    get_chain(conn, id)?
        .ok_or_else(|| ApprovalError::NotFound(format!("Approval chain {} does not exist", id)))
}

/// The chain registered for a project, if any
pub fn get_chain_for_project(conn: &Connection, project_id: ProjectId) -> Result<Option<ApprovalChain>> {
    let chain = conn
        .query_row(
            "SELECT id, project_id, created_at FROM approval_chains WHERE project_id = ?1",
            params![project_id.value()],
            chain_from_row,
        )
        .optional()?;
    Ok(chain)
}

/// All chains ordered by id
pub fn list_chains(conn: &Connection) -> Result<Vec<ApprovalChain>> {
    let mut stmt = conn.prepare("SELECT id, project_id, created_at FROM approval_chains ORDER BY id")?;
    let chains = stmt
        .query_map([], chain_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(chains)
}

/// Insert a pending step
pub fn insert_step(
    conn: &Connection,
    chain_id: ChainId,
    user_id: UserId,
    step_order: i64,
) -> Result<ApprovalChainStep> {
    conn.execute(
        "INSERT INTO approval_chain_steps (approval_chain_id, user_id, step_order, approved, approved_at)
         VALUES (?1, ?2, ?3, 0, NULL)",
        params![chain_id.value(), user_id.value(), step_order],
    )?;

    Ok(ApprovalChainStep {
        id: StepId::new(conn.last_insert_rowid()),
        approval_chain_id: chain_id,
        user_id,
        step_order,
        approved: false,
        approved_at: None,
    })
}

/// Get a step by id
pub fn get_step(conn: &Connection, id: StepId) -> Result<Option<ApprovalChainStep>> {
    let sql = format!("SELECT {} FROM approval_chain_steps WHERE id = ?1", STEP_COLUMNS);
    let step = conn
        .query_row(&sql, params![id.value()], step_from_row)
        .optional()?;
    Ok(step)
}

/// Get a step by id, `NotFound` if missing
pub fn require_step(conn: &Connection, id: StepId) -> Result<ApprovalChainStep> {
    get_step(conn, id)?
        .ok_or_else(|| ApprovalError::NotFound(format!("Approval step {} does not exist", id)))
}

/// Steps of a chain in ascending `step_order`
pub fn list_steps(conn: &Connection, chain_id: ChainId) -> Result<Vec<ApprovalChainStep>> {
    let sql = format!(
        "SELECT {} FROM approval_chain_steps WHERE approval_chain_id = ?1 ORDER BY step_order",
        STEP_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let steps = stmt
        .query_map(params![chain_id.value()], step_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(steps)
}

/// Mark a step approved. Returns false if it was already approved.
pub fn mark_step_approved(conn: &Connection, id: StepId, approved_at: DateTime<Utc>) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE approval_chain_steps SET approved = 1, approved_at = ?1
         WHERE id = ?2 AND approved = 0",
        params![approved_at, id.value()],
    )?;
    Ok(updated == 1)
}
