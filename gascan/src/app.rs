//! Orchestration of one invocation: decide, extract, resolve, run, finalize.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::cli::Cli;
use crate::core::args::{adhoc_args, inventory_query_args, playbook_args, shell_join};
use crate::core::mode_engine::{ModeDecision, resolve_mode};
use crate::core::run_mode::{Facet, RunMode};
use crate::core::runner_config::absolutize;
use crate::core::types::RunConfiguration;
use crate::exit_codes;
use crate::io::archive::extract_bundle;
use crate::io::cache::clear_inventory_cache;
use crate::io::files::write_file;
use crate::io::host::{HostInstaller, InstallSources};
use crate::io::identity::{HostEnv, machine_hash};
use crate::io::inventory::{JinjaInventoryTemplate, ResolvedInventory, resolve_inventory};
use crate::io::process::{BundledRunner, Launcher, RunOutcome, edit_files};
use crate::io::workspace::{Finalization, Workspace};
use crate::payload::Payload;

/// Runner executable inside the workspace.
pub const RUNNER_FILE: &str = "ansible.pex";
/// Runner configuration shipped in the bundle.
pub const RUNNER_CONFIG: &str = "default.cfg";
/// Rewritten runner configuration with absolute paths.
pub const ABSOLUTE_RUNNER_CONFIG: &str = "gascan.cfg";
/// Connectivity test playbook.
pub const TEST_PLAYBOOK: &str = "ping.yaml";
pub const DYNAMIC_INVENTORY_SCRIPT: &str = "dynamic-inventory.py";

/// Everything an invocation reads besides its flags.
pub struct RunContext<'a, L> {
    pub payload: &'a Payload,
    pub host: &'a HostEnv,
    pub launcher: &'a L,
    pub now: DateTime<Utc>,
}

/// Run the invocation described by `cli` and return the process exit code.
///
/// Fatal conditions are returned as errors. A failed runner stage is not an
/// error: its exit code is returned and the workspace is left in place with
/// a recovery recipe on stdout.
pub fn run<L: Launcher>(cli: Cli, ctx: &RunContext<'_, L>) -> Result<i32> {
    let request = cli.mode_request(ctx.host);
    let mode = match resolve_mode(&request, &ctx.payload.automations)? {
        ModeDecision::ShowVersion => {
            println!("{}", ctx.payload.versions);
            return Ok(exit_codes::OK);
        }
        ModeDecision::ListAutomations => {
            println!("{}", ctx.payload.automations.listing());
            return Ok(exit_codes::OK);
        }
        ModeDecision::GenerateHash => {
            let hash = machine_hash(&ctx.host.machine_id_path, "hash", ctx.now)
                .context("unable to generate hash")?;
            println!("{hash}");
            return Ok(exit_codes::OK);
        }
        ModeDecision::Run(mode) => mode,
    };

    let config = cli.into_configuration(mode);
    info!(mode = %config.mode, "starting run");
    let workspace = Workspace::open(config.extract_path.as_deref())?;
    let session = Session::prepare(&config, workspace.path(), ctx)?;

    let outcome = match config.mode.terminal() {
        Some(Facet::Extract) => {
            session.install_host()?;
            RunOutcome::success()
        }
        Some(Facet::InventoryQuery) => session
            .runner
            .show_inventory(ctx.launcher, &inventory_query_args(&config, &session.inventory.effective)),
        Some(Facet::Adhoc) => session
            .runner
            .run_adhoc(ctx.launcher, &adhoc_args(&config, &session.inventory.effective)),
        _ => session.run_stages()?,
    };

    if outcome.succeeded {
        if workspace.finalize(config.mode.auto_cleanup()) == Finalization::Preserved {
            println!("Workspace: {}", session.workspace.display());
        }
        return Ok(exit_codes::OK);
    }

    println!("{}", session.recovery_recipe());
    Ok(outcome.exit_code)
}

/// A populated workspace ready to drive the runner.
struct Session<'a, L> {
    config: &'a RunConfiguration,
    ctx: &'a RunContext<'a, L>,
    workspace: PathBuf,
    runner: BundledRunner,
    /// Absolutized runner configuration, when the bundle ships one.
    runner_config: Option<String>,
    inventory: ResolvedInventory,
}

impl<'a, L: Launcher> Session<'a, L> {
    #[instrument(skip_all, fields(workspace = %workspace.display()))]
    fn prepare(config: &'a RunConfiguration, workspace: &Path, ctx: &'a RunContext<'a, L>) -> Result<Self> {
        let report = extract_bundle(&ctx.payload.bundle, workspace, config.mode.contains(Facet::Adhoc))?;
        debug!(?report, "bundle extracted");

        let executable = workspace.join(RUNNER_FILE);
        write_file(&executable, &ctx.payload.runner, 0o550)?;

        let (config_path, runner_config) = absolutize_runner_config(workspace, &ctx.host.home)?;
        let runner = BundledRunner::new(executable, config_path);

        let template = JinjaInventoryTemplate::for_workspace(workspace)?;
        let inventory = resolve_inventory(&config.inventory, workspace, config, &template)?;
        if let Some(warning) = &inventory.warning {
            warn!("{warning}");
        }

        if config.clear_inventory_cache {
            match clear_inventory_cache(&ctx.payload.cache_paths, &ctx.host.home) {
                Ok(removed) => debug!(count = removed.len(), "inventory cache cleared"),
                Err(err) => warn!(err = %format!("{err:#}"), "unable to clear the inventory cache"),
            }
        }

        Ok(Self {
            config,
            ctx,
            workspace: workspace.to_path_buf(),
            runner,
            runner_config,
            inventory,
        })
    }

    fn install_host(&self) -> Result<()> {
        println!("Extracting bundle to: {}", self.workspace.display());
        let script = self.workspace.join(DYNAMIC_INVENTORY_SCRIPT);
        let seed = self.inventory.paths().first().map(PathBuf::from);
        let sources = InstallSources {
            runner: &self.ctx.payload.runner,
            helper: &self.ctx.payload.helper,
            runner_config: self
                .runner_config
                .as_deref()
                .filter(|_| self.ctx.payload.extract_runner_config),
            dynamic_inventory: (self.ctx.payload.extract_dynamic_inventory && script.is_file())
                .then_some(script.as_path()),
            seed_inventory: seed.as_deref(),
            monitor: &self.config.monitor,
        };
        let report = HostInstaller::new(self.ctx.host, self.ctx.now).install(&sources)?;
        println!("{report}");
        Ok(())
    }

    /// Configure, test and deploy, in that order, for the facets selected.
    fn run_stages(&self) -> Result<RunOutcome> {
        let mode: RunMode = self.config.mode;

        if mode.contains(Facet::Config) {
            let paths = self.inventory.paths();
            let outcome = edit_files(self.ctx.launcher, &self.config.editor, &paths);
            if !outcome.succeeded {
                bail!(
                    "unable to make the necessary configuration changes: {} exited with {}",
                    self.config.editor,
                    outcome.exit_code
                );
            }
        }

        let args = self.playbook_args();
        if mode.contains(Facet::Test) {
            let outcome = self
                .runner
                .run_playbook(self.ctx.launcher, &self.workspace.join(TEST_PLAYBOOK), &args);
            if !outcome.succeeded {
                return Ok(outcome);
            }
        }

        if mode.contains(Facet::Deploy) {
            return Ok(self.runner.run_playbook(
                self.ctx.launcher,
                &self.workspace.join(&self.config.automation),
                &args,
            ));
        }

        Ok(RunOutcome::success())
    }

    fn playbook_args(&self) -> Vec<String> {
        let ask_become_pass = !self.config.passwordless_sudo && !self.ctx.host.become_password_provided;
        playbook_args(self.config, ask_become_pass, &self.inventory.effective)
    }

    /// Commands an operator can paste to repeat the test and deploy stages.
    fn recovery_recipe(&self) -> String {
        let env = format!(
            "ANSIBLE_CONFIG={} PEX_SCRIPT=ansible-playbook",
            shell_join(&[self.runner.config().display().to_string()])
        );
        let executable = self.runner.executable().display().to_string();
        let command = |playbook: &str| {
            let mut argv = vec![executable.clone(), self.workspace.join(playbook).display().to_string()];
            argv.extend(self.playbook_args());
            format!("{env} {}", shell_join(&argv))
        };
        format!(
            "Your workspace has been left in place: {}\nRun ping test: {}\nRun deploy: {}",
            self.workspace.display(),
            command(TEST_PLAYBOOK),
            command(&self.config.automation),
        )
    }
}

/// Write `gascan.cfg` with absolute paths when the bundle ships `default.cfg`.
///
/// Returns the config path to hand the runner and the rewritten contents.
fn absolutize_runner_config(workspace: &Path, home: &Path) -> Result<(PathBuf, Option<String>)> {
    let source = workspace.join(RUNNER_CONFIG);
    if !source.is_file() {
        debug!(path = %source.display(), "no runner configuration in bundle");
        return Ok((source, None));
    }
    let raw = std::fs::read_to_string(&source)
        .with_context(|| format!("read {}", source.display()))?;
    let rewritten = absolutize(
        &raw,
        &workspace.display().to_string(),
        &home.display().to_string(),
    );
    let target = workspace.join(ABSOLUTE_RUNNER_CONFIG);
    write_file(&target, rewritten.as_bytes(), 0o640)?;
    Ok((target, Some(rewritten)))
}
