//! Stable exit codes for engine CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed on an unreadable file, a bad config or an engine error.
pub const FAILURE: i32 = 1;
/// `engine validate` rejected the scenario.
pub const INVALID: i32 = 2;
/// `engine deliberate` found nothing executable.
pub const IDLE: i32 = 3;
