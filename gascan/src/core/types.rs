//! Configuration shared by every stage of an invocation.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::run_mode::RunMode;

/// Immutable record built once from flags and environment.
///
/// Serialized as the data object handed to the inventory template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfiguration {
    /// Editor used by the configure stage.
    pub editor: String,
    /// Comma-joined inventory paths; empty when none was given.
    pub inventory: String,
    /// Automation file run by the deploy stage, e.g. `site.yaml`.
    pub automation: String,
    pub tags: Option<String>,
    pub skip_tags: Option<String>,
    /// Sudo on the targets does not prompt for a password.
    pub passwordless_sudo: bool,
    /// Host-limit pattern forwarded to the runner.
    pub limit: Option<String>,
    /// Alias of the monitoring host.
    pub monitor: String,
    /// Arguments after `--`, forwarded verbatim.
    pub extra_args: Vec<String>,
    /// Parent directory for the workspace; platform temp dir when `None`.
    pub extract_path: Option<PathBuf>,
    pub clear_inventory_cache: bool,
    #[serde(skip)]
    pub mode: RunMode,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            editor: "vi".to_string(),
            inventory: String::new(),
            automation: "site.yaml".to_string(),
            tags: None,
            skip_tags: None,
            passwordless_sudo: false,
            limit: None,
            monitor: "monitor".to_string(),
            extra_args: Vec::new(),
            extract_path: None,
            clear_inventory_cache: false,
            mode: RunMode::empty(),
        }
    }
}
