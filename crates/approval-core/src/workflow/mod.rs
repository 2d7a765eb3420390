//! Approval workflow module

pub mod traits;
pub mod progress;
pub mod chain_creator;
pub mod approve_action;

pub use traits::{RoleProvider, StaticRoleProvider, SqliteRoleProvider};
pub use progress::ChainProgress;
pub use chain_creator::ChainCreator;
pub use approve_action::ApproveAndForwardAction;
