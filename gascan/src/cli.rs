//! Flag and environment ingestion.
//!
//! Every flag can be defaulted from a `GASCAN_FLAG_*` variable. Boolean
//! variables accept the usual yes/no/true/false/on/off/1/0 spellings.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};

use crate::core::mode_engine::ModeRequest;
use crate::core::run_mode::RunMode;
use crate::core::types::RunConfiguration;
use crate::io::identity::HostEnv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "gascan",
    about = "Self-contained bootstrapper for the bundled automation",
    disable_version_flag = true
)]
pub struct Cli {
    /// Skip initial configuration of the inventory.
    #[arg(long, env = "GASCAN_FLAG_SKIP_CONFIGURE", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub skip_configure: bool,

    /// Skip deploying the selected playbook.
    #[arg(long, env = "GASCAN_FLAG_SKIP_DEPLOY", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub skip_deploy: bool,

    /// Run the connectivity test playbook (ping.yaml) first.
    #[arg(long, env = "GASCAN_FLAG_TEST", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub test: bool,

    /// Extract the bundle and install persistent helpers into the home directory.
    #[arg(long, env = "GASCAN_FLAG_EXTRACT_BUNDLE", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub extract_bundle: bool,

    /// Parent directory for the workspace (defaults to the system temp dir).
    #[arg(long, env = "GASCAN_FLAG_EXTRACT_PATH")]
    pub extract_path: Option<PathBuf>,

    /// The use of sudo does not require a password.
    #[arg(long, env = "GASCAN_FLAG_PASSWORDLESS_SUDO", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub passwordless_sudo: bool,

    /// Path to the preferred editor.
    #[arg(long, env = "EDITOR", default_value = "vi")]
    pub editor: String,

    /// Custom inventory, comma-separated for several files.
    #[arg(long, env = "GASCAN_FLAG_INVENTORY")]
    pub inventory: Option<String>,

    /// Playbook used for deployment.
    #[arg(long, env = "GASCAN_FLAG_PLAYBOOK", default_value = "site.yaml")]
    pub playbook: String,

    /// Tags to run.
    #[arg(long, env = "GASCAN_FLAG_TAGS")]
    pub tags: Option<String>,

    /// Tags to skip.
    #[arg(long, env = "GASCAN_FLAG_SKIP_TAGS")]
    pub skip_tags: Option<String>,

    /// Limit the run to matching hosts.
    #[arg(long, env = "GASCAN_FLAG_LIMIT")]
    pub limit: Option<String>,

    /// Monitor alias used in generated inventories.
    #[arg(long, env = "GASCAN_FLAG_MONITOR", default_value = "monitor")]
    pub monitor: String,

    /// Logging verbosity.
    #[arg(long, env = "GASCAN_FLAG_LOG_LEVEL", value_enum, default_value_t = LogLevel::Error)]
    pub log_level: LogLevel,

    /// Show version information.
    #[arg(long, action = ArgAction::SetTrue)]
    pub version: bool,

    /// List the available playbooks.
    #[arg(long, action = ArgAction::SetTrue)]
    pub list_playbooks: bool,

    /// Print a hash derived from the machine identity.
    #[arg(long, action = ArgAction::SetTrue)]
    pub generate_hash: bool,

    /// Show the resolved inventory instead of running a playbook.
    #[arg(long, env = "GASCAN_FLAG_SHOW_INVENTORY", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub show_inventory: bool,

    /// Run an ad-hoc command with the arguments after `--`.
    #[arg(long, env = "GASCAN_FLAG_ADHOC", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub adhoc: bool,

    /// Remove cached dynamic inventory data before running.
    #[arg(long, env = "GASCAN_FLAG_CLEAR_INVENTORY_CACHE", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub clear_inventory_cache: bool,

    /// Arguments passed through to the runner.
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

impl Cli {
    fn explicit_inventory(&self) -> Option<&str> {
        self.inventory
            .as_deref()
            .map(str::trim)
            .filter(|inventory| !inventory.is_empty())
    }

    pub fn mode_request(&self, host: &HostEnv) -> ModeRequest {
        ModeRequest {
            show_version: self.version,
            list_automations: self.list_playbooks,
            generate_hash: self.generate_hash,
            test: self.test,
            skip_configure: self.skip_configure,
            skip_deploy: self.skip_deploy,
            inventory_query: self.show_inventory,
            extract: self.extract_bundle,
            adhoc: self.adhoc,
            explicit_inventory: self.explicit_inventory().is_some(),
            automation: self.playbook.clone(),
            passthrough_args: self.extra_args.len(),
            default_inventory_opt_in: host.default_inventory_opt_in.clone(),
        }
    }

    pub fn into_configuration(self, mode: RunMode) -> RunConfiguration {
        let inventory = self.explicit_inventory().unwrap_or_default().to_string();
        RunConfiguration {
            editor: self.editor,
            inventory,
            automation: self.playbook,
            tags: self.tags.filter(|tags| !tags.is_empty()),
            skip_tags: self.skip_tags.filter(|tags| !tags.is_empty()),
            passwordless_sudo: self.passwordless_sudo,
            limit: self.limit.filter(|limit| !limit.is_empty()),
            monitor: self.monitor,
            extra_args: self.extra_args,
            extract_path: self.extract_path,
            clear_inventory_cache: self.clear_inventory_cache,
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::run_mode::Facet;

    fn host() -> HostEnv {
        HostEnv {
            home: PathBuf::from("/home/op"),
            machine_id_path: PathBuf::from("/etc/machine-id"),
            default_inventory_opt_in: Some("no".to_string()),
            become_password_provided: false,
        }
    }

    #[test]
    fn parses_flags_and_trailing_arguments() {
        let cli = Cli::parse_from([
            "gascan",
            "--adhoc",
            "--inventory",
            "/a.yaml",
            "--limit",
            "db",
            "--",
            "all",
            "-m",
            "ping",
        ]);
        assert!(cli.adhoc);
        assert_eq!(cli.extra_args, vec!["all", "-m", "ping"]);

        let request = cli.mode_request(&host());
        assert!(request.adhoc);
        assert!(request.explicit_inventory);
        assert_eq!(request.passthrough_args, 3);
        assert_eq!(request.default_inventory_opt_in.as_deref(), Some("no"));

        let config = cli.into_configuration(RunMode::empty().with(Facet::Adhoc));
        assert_eq!(config.inventory, "/a.yaml");
        assert_eq!(config.limit.as_deref(), Some("db"));
        assert!(config.mode.contains(Facet::Adhoc));
    }

    #[test]
    fn defaults_match_configuration_defaults() {
        let cli = Cli::try_parse_from(["gascan"]).expect("parse");
        assert_eq!(cli.playbook, "site.yaml");
        assert_eq!(cli.monitor, "monitor");
        assert_eq!(cli.log_level, LogLevel::Error);
        assert!(!cli.mode_request(&host()).explicit_inventory);
    }

    #[test]
    fn blank_inventory_is_not_explicit() {
        let cli = Cli::parse_from(["gascan", "--inventory", "  "]);
        assert!(!cli.mode_request(&host()).explicit_inventory);
        assert_eq!(cli.into_configuration(RunMode::empty()).inventory, "");
    }

    #[test]
    fn info_queries_parse() {
        let cli = Cli::parse_from(["gascan", "--version", "--list-playbooks", "--generate-hash"]);
        let request = cli.mode_request(&host());
        assert!(request.show_version);
        assert!(request.list_automations);
        assert!(request.generate_hash);
    }

    #[test]
    fn trailing_arguments_require_separator() {
        assert!(Cli::try_parse_from(["gascan", "all"]).is_err());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        assert!(Cli::try_parse_from(["gascan", "--log-level", "loud"]).is_err());
    }
}
