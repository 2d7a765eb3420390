/// Presentation constants for the approve action

pub const ACTION_LABEL: &str = "Approve";

pub const ICON_PENDING: &str = "heroicon-o-arrow-right";
pub const ICON_APPROVED: &str = "heroicon-o-check";

pub const COLOR_PENDING: &str = "primary";
pub const COLOR_APPROVED: &str = "success";
