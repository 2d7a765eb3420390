//! Configuration management for the approval system

use serde::{Deserialize, Serialize};
use crate::error::{ApprovalError, Result};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `APPROVAL__DATABASE__PATH`
pub const ENV_PREFIX: &str = "APPROVAL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApprovalConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub roles: RolesConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(alias = "file", default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_database_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Users holding only this role never see the approve action
    #[serde(default = "default_baseline_role")]
    pub baseline_role: String,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self { baseline_role: default_baseline_role() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowConfig {
    /// Status a project moves to once its chain is fully approved.
    /// When unset the status is incremented by one.
    #[serde(default)]
    pub completed_status_id: Option<i64>,
}

// Default functions
fn default_database_path() -> PathBuf {
    PathBuf::from("approvals.db")
}

fn default_baseline_role() -> String {
    "Default role".to_string()
}

impl ApprovalConfig {
    /// Load configuration from a JSON file, with `APPROVAL__SECTION__KEY`
    /// environment variables taking precedence
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ApprovalError::Config(format!(
                "Config file not found: {}", path.display()
            )));
        }

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Json))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ApprovalError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ApprovalError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ApprovalError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ApprovalError::Config("Database path is required".to_string()));
        }

        if self.roles.baseline_role.trim().is_empty() {
            return Err(ApprovalError::Config("Baseline role name is required".to_string()));
        }

        if let Some(status) = self.workflow.completed_status_id {
            if status <= 0 {
                return Err(ApprovalError::Config(format!(
                    "completed_status_id must be positive, got {}", status
                )));
            }
        }

        Ok(())
    }
}
