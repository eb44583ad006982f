//! Interactive child processes: the bundled runner and the operator's editor.
//!
//! Children inherit the parent's stdin/stdout/stderr. A child that fails or
//! never starts is reported through [`RunOutcome`], not as an error, so the
//! orchestrator can hand its exit code back to the shell.

use std::ffi::OsString;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, error, instrument};

/// Exit code reported when the child could not be started.
pub const SPAWN_FAILURE_CODE: i32 = 1;

/// Environment variable selecting the runner persona.
pub const PERSONA_ENV: &str = "PEX_SCRIPT";
/// Environment variable pointing the runner at its configuration.
pub const CONFIG_ENV: &str = "ANSIBLE_CONFIG";

/// A fully described child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Added on top of the inherited environment.
    pub env: Vec<(String, OsString)>,
}

/// Result of a child process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub succeeded: bool,
    pub exit_code: i32,
}

impl RunOutcome {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            succeeded: false,
            exit_code,
        }
    }

    /// Signal-terminated children report `128 + signal`.
    pub fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            return Self::success();
        }
        let code = status
            .code()
            .or_else(|| status.signal().map(|signal| 128 + signal))
            .unwrap_or(SPAWN_FAILURE_CODE);
        Self::failure(code)
    }
}

/// Starts a child process and blocks until it exits.
pub trait Launcher {
    fn launch(&self, request: &LaunchRequest) -> RunOutcome;
}

/// Launcher wired to the terminal: all three standard streams are inherited.
#[derive(Debug, Default, Clone, Copy)]
pub struct InheritedStdio;

impl Launcher for InheritedStdio {
    #[instrument(skip_all, fields(program = %request.program.display()))]
    fn launch(&self, request: &LaunchRequest) -> RunOutcome {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .envs(request.env.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        debug!(args = ?request.args, env = ?request.env, "spawning child process");
        match cmd.status() {
            Ok(status) => {
                let outcome = RunOutcome::from_status(status);
                if !outcome.succeeded {
                    error!(exit_code = outcome.exit_code, "command failed");
                }
                outcome
            }
            Err(err) => {
                error!(err = %err, "failed to execute command");
                RunOutcome::failure(SPAWN_FAILURE_CODE)
            }
        }
    }
}

/// Behavior selected from the multi-tool runner executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Playbook,
    Adhoc,
    Inventory,
}

impl Persona {
    pub fn script(self) -> &'static str {
        match self {
            Persona::Playbook => "ansible-playbook",
            Persona::Adhoc => "ansible",
            Persona::Inventory => "ansible-inventory",
        }
    }
}

/// The runner executable extracted into the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledRunner {
    executable: PathBuf,
    config: PathBuf,
}

impl BundledRunner {
    pub fn new(executable: impl Into<PathBuf>, config: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            config: config.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn config(&self) -> &Path {
        &self.config
    }

    pub fn request(&self, persona: Persona, args: Vec<String>) -> LaunchRequest {
        LaunchRequest {
            program: self.executable.clone(),
            args,
            env: vec![
                (PERSONA_ENV.to_string(), OsString::from(persona.script())),
                (CONFIG_ENV.to_string(), self.config.clone().into_os_string()),
            ],
        }
    }

    /// Run `playbook` with `args` appended.
    pub fn run_playbook<L: Launcher>(&self, launcher: &L, playbook: &Path, args: &[String]) -> RunOutcome {
        let mut full = vec![playbook.display().to_string()];
        full.extend(args.iter().cloned());
        debug!(playbook = %playbook.display(), "executing playbook");
        launcher.launch(&self.request(Persona::Playbook, full))
    }

    pub fn run_adhoc<L: Launcher>(&self, launcher: &L, args: &[String]) -> RunOutcome {
        debug!("executing adhoc command");
        launcher.launch(&self.request(Persona::Adhoc, args.to_vec()))
    }

    pub fn show_inventory<L: Launcher>(&self, launcher: &L, args: &[String]) -> RunOutcome {
        debug!("showing the inventory");
        launcher.launch(&self.request(Persona::Inventory, args.to_vec()))
    }
}

/// Open `files` in `editor` for interactive changes.
pub fn edit_files<L: Launcher>(launcher: &L, editor: &str, files: &[&str]) -> RunOutcome {
    debug!(editor, ?files, "configuring inventory");
    launcher.launch(&LaunchRequest {
        program: PathBuf::from(editor),
        args: files.iter().map(|file| (*file).to_string()).collect(),
        env: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingLauncher;

    fn runner() -> BundledRunner {
        BundledRunner::new("/ws/ansible.pex", "/ws/gascan.cfg")
    }

    #[test]
    fn playbook_request_sets_persona_and_config() {
        let launcher = RecordingLauncher::default();
        let outcome = runner().run_playbook(
            &launcher,
            Path::new("/ws/site.yaml"),
            &["--tags".to_string(), "sudo".to_string()],
        );
        assert_eq!(outcome, RunOutcome::success());

        let requests = launcher.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.program, PathBuf::from("/ws/ansible.pex"));
        assert_eq!(request.args, vec!["/ws/site.yaml", "--tags", "sudo"]);
        assert_eq!(
            request.env,
            vec![
                ("PEX_SCRIPT".to_string(), OsString::from("ansible-playbook")),
                ("ANSIBLE_CONFIG".to_string(), OsString::from("/ws/gascan.cfg")),
            ]
        );
    }

    #[test]
    fn adhoc_and_inventory_use_their_personas() {
        let launcher = RecordingLauncher::default();
        runner().run_adhoc(&launcher, &["all".to_string()]);
        runner().show_inventory(&launcher, &["--list".to_string()]);

        let requests = launcher.requests();
        assert_eq!(requests[0].env[0].1, OsString::from("ansible"));
        assert_eq!(requests[0].args, vec!["all"]);
        assert_eq!(requests[1].env[0].1, OsString::from("ansible-inventory"));
    }

    #[test]
    fn failure_outcome_is_propagated() {
        let launcher = RecordingLauncher::new(vec![RunOutcome::failure(4)]);
        let outcome = runner().run_adhoc(&launcher, &["all".to_string()]);
        assert_eq!(outcome, RunOutcome::failure(4));
    }

    #[test]
    fn inherited_launcher_reports_exit_codes() {
        let launcher = InheritedStdio;
        let ok = launcher.launch(&LaunchRequest {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), "exit 0".to_string()],
            env: Vec::new(),
        });
        assert_eq!(ok, RunOutcome::success());

        let failed = launcher.launch(&LaunchRequest {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), "exit 3".to_string()],
            env: Vec::new(),
        });
        assert_eq!(failed, RunOutcome::failure(3));
    }

    #[test]
    fn inherited_launcher_passes_environment() {
        let launcher = InheritedStdio;
        let outcome = launcher.launch(&LaunchRequest {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), "test \"$PEX_SCRIPT\" = ansible".to_string()],
            env: vec![("PEX_SCRIPT".to_string(), OsString::from("ansible"))],
        });
        assert!(outcome.succeeded);
    }

    #[test]
    fn missing_program_is_a_generic_failure() {
        let outcome = InheritedStdio.launch(&LaunchRequest {
            program: PathBuf::from("/definitely/not/a/program"),
            args: Vec::new(),
            env: Vec::new(),
        });
        assert_eq!(outcome, RunOutcome::failure(SPAWN_FAILURE_CODE));
    }

    #[test]
    fn editor_receives_inventory_files() {
        let launcher = RecordingLauncher::default();
        edit_files(&launcher, "nano", &["/a.yaml", "/b.yaml"]);
        let request = &launcher.requests()[0];
        assert_eq!(request.program, PathBuf::from("nano"));
        assert_eq!(request.args, vec!["/a.yaml", "/b.yaml"]);
        assert!(request.env.is_empty());
    }
}
