//! Deterministic, pure logic shared by the bootstrapper.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod archive_path;
pub mod args;
pub mod inventory_spec;
pub mod mode_engine;
pub mod registry;
pub mod run_mode;
pub mod runner_config;
pub mod truthy;
pub mod types;
