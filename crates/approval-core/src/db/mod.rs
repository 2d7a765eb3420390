//! SQLite persistence for projects, memberships, roles and approval chains
//!
//! ## Tables
//!
//! - `projects` - workflow subjects with their ordinal `status_id`
//! - `project_users` - memberships, a user may be listed more than once
//! - `approval_chains` - one row per project
//! - `approval_chain_steps` - ordered steps, owned by their chain
//! - `user_roles` - role names per user
//!
//! Query functions take a `&Connection` so callers can run them inside a
//! transaction (`rusqlite::Transaction` derefs to `Connection`).

pub mod schema;
pub mod projects;
pub mod chains;
pub mod roles;

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;

use crate::error::{ApprovalError, Result};

/// How long a writer waits for another handle's write transaction
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database holding all approval state
pub struct ApprovalDb {
    conn: Mutex<Connection>,
}

impl ApprovalDb {
    /// Open or create the database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Opening SQLite database at {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        log::debug!("Opening in-memory SQLite database");
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a read with shared access to the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock()
            .map_err(|e| ApprovalError::Lock(e.to_string()))?;
        f(&conn)
    }

    /// Run a write with exclusive access (needed to open transactions)
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock()
            .map_err(|e| ApprovalError::Lock(e.to_string()))?;
        f(&mut conn)
    }

    /// Row counts per table
    pub fn stats(&self) -> Result<DbStats> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<u64> {
                let n: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {}", table),
                    [],
                    |row| row.get(0),
                )?;
                Ok(n as u64)
            };

            Ok(DbStats {
                project_count: count("projects")?,
                member_count: count("project_users")?,
                chain_count: count("approval_chains")?,
                step_count: count("approval_chain_steps")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub project_count: u64,
    pub member_count: u64,
    pub chain_count: u64,
    pub step_count: u64,
}
