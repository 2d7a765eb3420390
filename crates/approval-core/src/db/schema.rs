//! Database schema definitions

use rusqlite::{Connection, OptionalExtension};

use crate::error::{ApprovalError, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema. A database stamped with any other
/// version is refused, as no migrations exist yet.
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        log::info!("Creating new database schema v{}", SCHEMA_VERSION);
        conn.execute_batch(TABLES_SCHEMA)?;
        conn.execute_batch(INDEXES_SCHEMA)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version == SCHEMA_VERSION {
        log::debug!("Database schema is up to date (v{})", current_version);
    } else {
        return Err(ApprovalError::Config(format!(
            "Unsupported database schema v{} (expected v{})", current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Current schema version, 0 if not initialized
fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .optional()?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

const TABLES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    status_id INTEGER NOT NULL DEFAULT 1,
    owner_id INTEGER NOT NULL,
    ticket_prefix TEXT NOT NULL,
    status_type TEXT NOT NULL DEFAULT 'default',
    type TEXT NOT NULL DEFAULT 'project'
);

CREATE TABLE IF NOT EXISTS project_users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS approval_chains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL UNIQUE REFERENCES projects(id),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS approval_chain_steps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    approval_chain_id INTEGER NOT NULL REFERENCES approval_chains(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL,
    step_order INTEGER NOT NULL CHECK (step_order >= 1),
    approved INTEGER NOT NULL DEFAULT 0,
    approved_at TEXT,
    CHECK ((approved = 0 AND approved_at IS NULL) OR (approved = 1 AND approved_at IS NOT NULL)),
    UNIQUE (approval_chain_id, step_order)
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id INTEGER NOT NULL,
    role_name TEXT NOT NULL,
    PRIMARY KEY (user_id, role_name)
);
"#;

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_project_users_project ON project_users(project_id);
CREATE INDEX IF NOT EXISTS idx_steps_chain ON approval_chain_steps(approval_chain_id);
"#;
