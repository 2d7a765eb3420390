//! Project Approvals Core Library
//!
//! Sequential approval chains for projects: chain creation, the
//! approve-and-forward action and the SQLite storage behind them.

pub mod config;
pub mod clock;
pub mod constants;
pub mod db;
pub mod error;
pub mod workflow;

pub use config::ApprovalConfig;
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::ApprovalDb;
pub use error::{ApprovalError, Result};

pub use workflow::{
    ApproveAndForwardAction,
    ChainCreator,
    ChainProgress,
    RoleProvider,
    SqliteRoleProvider,
    StaticRoleProvider,
};

pub use approval_types as types;
