//! Stable exit codes for the bootstrapper.
//!
//! A failed runner stage exits with the runner's own code instead.

/// Run succeeded or an informational query was answered.
pub const OK: i32 = 0;
/// Fatal internal condition: invalid playbook, missing machine identity,
/// ad-hoc without arguments, unusable workspace or bundle.
pub const INVALID: i32 = 1;
