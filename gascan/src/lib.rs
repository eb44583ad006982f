//! Self-contained bootstrapper for a bundled automation runner.
//!
//! The executable embeds a gzip tarball of automation content and a runner
//! executable. Each invocation extracts them into a private workspace,
//! resolves the inventory, drives the runner, and cleans up or leaves the
//! workspace behind with a recovery recipe.
//!
//! - **[`core`]**: Pure, deterministic logic (mode selection, path policy,
//!   argument assembly). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (extraction, workspace, processes,
//!   host install). Process launches sit behind a trait for tests.
//!
//! [`app`] coordinates the two for one invocation; [`cli`] turns flags and
//! environment into its inputs and [`payload`] holds the embedded artifacts.

pub mod app;
pub mod cli;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod payload;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
