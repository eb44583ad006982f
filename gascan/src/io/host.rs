//! Persistent install of helpers and sample configuration for the operator.
//!
//! Every artifact is first-run-wins: an existing file or link is never
//! replaced, so a second install against the same home is a no-op.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::io::files::{create_dir_if_missing, exists_no_follow, write_new_file};
use crate::io::identity::{HostEnv, machine_hash};

pub const CONFIG_DIR_MODE: u32 = 0o700;
pub const BIN_DIR_MODE: u32 = 0o750;

const VAULT_KEY: &str = ".vault-key";
const HELPER: &str = "ansible.sh";
const PERSISTENT_RUNNER: &str = "ansible.pex";
const SECRETS: &str = "secrets.yaml";
const INVENTORY_CONFIG: &str = "inventory-config.json";
const CONNECT_CONFIG: &str = "connect-py.json";
const DYNAMIC_INVENTORY: &str = "dynamic-inventory.py";
const USER_RUNNER_CONFIG: &str = ".ansible.cfg";

/// Names in the bin directory that dispatch through the helper script.
pub const HELPER_LINKS: [&str; 5] = [
    "ansible",
    "ansible-playbook",
    "ansible-vault",
    "ansible-config",
    "ansible-inventory",
];

pub const INVENTORY_ENDPOINT: &str = "http://localhost/inventory";
pub const CONNECT_SERVER_ADDRESS: &str = "https://localhost:8443";

const HEADER_CONTENT_TYPE: &str = "Content-type";
const HEADER_IDENTIFIER: &str = "Auth-Id";
const HEADER_MONITOR_NAME: &str = "Monitor-Name";
const HEADER_TOKEN: &str = "Auth-Token";

/// Settings for the dynamic inventory script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFetchConfig {
    pub headers: BTreeMap<String, String>,
    pub key_file: String,
    pub retry_attempts: u32,
    pub retry_wait_seconds: u32,
    pub uri: String,
}

impl InventoryFetchConfig {
    pub fn identifier(&self) -> Option<&str> {
        self.headers.get(HEADER_IDENTIFIER).map(String::as_str)
    }

    pub fn token(&self) -> Option<&str> {
        self.headers.get(HEADER_TOKEN).map(String::as_str)
    }
}

/// Settings for the connection helper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectConfig {
    pub log_level: String,
    pub server_address: String,
    pub tls_insecure: bool,
    pub inventory: ConnectInventory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectInventory {
    pub source: String,
    pub hosts: BTreeMap<String, serde_json::Value>,
}

impl ConnectConfig {
    fn sample(monitor: &str) -> Self {
        let mut hosts = BTreeMap::new();
        hosts.insert(
            monitor.to_string(),
            json!({ "ssh": { "custom_labels": { "port": 22 } } }),
        );
        Self {
            log_level: "warning".to_string(),
            server_address: CONNECT_SERVER_ADDRESS.to_string(),
            tls_insecure: false,
            inventory: ConnectInventory {
                source: "pmm".to_string(),
                hosts,
            },
        }
    }
}

/// Content taken from the current invocation.
#[derive(Debug, Clone, Copy)]
pub struct InstallSources<'a> {
    /// Bytes of the bundled runner executable.
    pub runner: &'a [u8],
    /// Dispatch script installed as `ansible.sh`.
    pub helper: &'a [u8],
    /// Absolutized runner configuration; `None` skips `~/.ansible.cfg`.
    pub runner_config: Option<&'a str>,
    /// Dynamic inventory script in the workspace; `None` skips it.
    pub dynamic_inventory: Option<&'a Path>,
    /// First resolved inventory path, copied as the seed secrets document.
    pub seed_inventory: Option<&'a Path>,
    /// Monitor alias used in the sample configuration.
    pub monitor: &'a str,
}

/// What an install did, plus the values the operator needs next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub bin_dir: PathBuf,
    pub config_dir: PathBuf,
    pub vault_key: PathBuf,
    pub inventory_config: PathBuf,
    pub dynamic_inventory: PathBuf,
    pub identifier: String,
    pub token: String,
    pub created: Vec<PathBuf>,
    pub kept: Vec<PathBuf>,
}

impl InstallReport {
    fn record(&mut self, path: PathBuf, created: bool) {
        if created {
            info!(path = %path.display(), "created");
            self.created.push(path);
        } else {
            debug!(path = %path.display(), "kept existing");
            self.kept.push(path);
        }
    }
}

impl fmt::Display for InstallReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Helpers created in: {}", self.bin_dir.display())?;
        writeln!(f, "Configuration stored in: {}", self.config_dir.display())?;
        writeln!(f)?;
        writeln!(f, "Add the following to your shell profile:")?;
        writeln!(f, "  export PATH=\"{}:$PATH\"", self.bin_dir.display())?;
        writeln!(
            f,
            "  export ANSIBLE_VAULT_PASSWORD_FILE=\"{}\"",
            self.vault_key.display()
        )?;
        writeln!(f)?;
        writeln!(f, "Register this host with the inventory service using:")?;
        writeln!(f, "  {HEADER_IDENTIFIER}: {}", self.identifier)?;
        writeln!(f, "  {HEADER_TOKEN}: {}", self.token)?;
        writeln!(f)?;
        writeln!(f, "Example commands:")?;
        writeln!(
            f,
            "  ansible-inventory --inventory {} --list",
            self.dynamic_inventory.display()
        )?;
        writeln!(
            f,
            "  ansible-vault edit {}",
            self.config_dir.join(SECRETS).display()
        )?;
        write!(f, "  (inventory service settings: {})", self.inventory_config.display())
    }
}

/// Writes the persistent artifacts into a [`HostEnv`]'s directories.
#[derive(Debug)]
pub struct HostInstaller<'a> {
    host: &'a HostEnv,
    now: DateTime<Utc>,
}

impl<'a> HostInstaller<'a> {
    pub fn new(host: &'a HostEnv, now: DateTime<Utc>) -> Self {
        Self { host, now }
    }

    /// Materialize every missing artifact.
    ///
    /// Failing to create either directory, the key, or a helper link is
    /// fatal. A seed inventory that cannot be read is only logged.
    #[instrument(skip_all, fields(home = %self.host.home.display()))]
    pub fn install(&self, sources: &InstallSources<'_>) -> Result<InstallReport> {
        let bin_dir = self.host.bin_dir();
        let config_dir = self.host.config_dir();
        let vault_key = config_dir.join(VAULT_KEY);
        let inventory_config = config_dir.join(INVENTORY_CONFIG);

        let mut report = InstallReport {
            bin_dir: bin_dir.clone(),
            config_dir: config_dir.clone(),
            vault_key: vault_key.clone(),
            inventory_config: inventory_config.clone(),
            dynamic_inventory: bin_dir.join(DYNAMIC_INVENTORY),
            identifier: String::new(),
            token: String::new(),
            created: Vec::new(),
            kept: Vec::new(),
        };

        create_dir_if_missing(&config_dir, CONFIG_DIR_MODE)
            .with_context(|| format!("failed to create config directory {}", config_dir.display()))?;
        create_dir_if_missing(&bin_dir, BIN_DIR_MODE)
            .with_context(|| format!("failed to create bin directory {}", bin_dir.display()))?;

        let created = if exists_no_follow(&vault_key) {
            false
        } else {
            let key = machine_hash(&self.host.machine_id_path, "vault", self.now)
                .context("unable to generate vault key")?;
            write_new_file(&vault_key, key.as_bytes(), 0o400)
                .with_context(|| format!("failed to create vault key {}", vault_key.display()))?
        };
        report.record(vault_key.clone(), created);

        self.install_helper(&bin_dir, sources.helper, &mut report)?;

        let runner = config_dir.join(PERSISTENT_RUNNER);
        let created = write_new_file(&runner, sources.runner, 0o550)?;
        report.record(runner, created);

        if let Some(contents) = sources.runner_config {
            let path = self.host.home.join(USER_RUNNER_CONFIG);
            let created = write_new_file(&path, contents.as_bytes(), 0o640)?;
            report.record(path, created);
        }

        if let Some(script) = sources.dynamic_inventory {
            match fs::read(script) {
                Ok(contents) => {
                    let target = report.dynamic_inventory.clone();
                    let created = write_new_file(&target, &contents, 0o550)?;
                    report.record(target, created);
                }
                Err(err) => warn!(path = %script.display(), err = %err, "dynamic inventory script unavailable"),
            }
        }

        let secrets = config_dir.join(SECRETS);
        if let Some(seed) = sources.seed_inventory {
            if exists_no_follow(&secrets) {
                report.record(secrets, false);
            } else {
                match fs::read(seed) {
                    Ok(contents) => {
                        println!("Copying inventory '{}' to '{}'", seed.display(), secrets.display());
                        let created = write_new_file(&secrets, &contents, 0o600)?;
                        report.record(secrets, created);
                    }
                    Err(err) => warn!(path = %seed.display(), err = %err, "unable to read seed inventory"),
                }
            }
        }

        self.install_inventory_config(&inventory_config, &vault_key, sources.monitor, &mut report)?;

        let connect = config_dir.join(CONNECT_CONFIG);
        let body = to_json(&ConnectConfig::sample(sources.monitor))?;
        let created = write_new_file(&connect, body.as_bytes(), 0o640)?;
        report.record(connect, created);

        Ok(report)
    }

    fn install_helper(&self, bin_dir: &Path, helper: &[u8], report: &mut InstallReport) -> Result<()> {
        let helper_path = bin_dir.join(HELPER);
        let created = write_new_file(&helper_path, helper, 0o750)?;
        report.record(helper_path.clone(), created);

        for name in HELPER_LINKS {
            let link = bin_dir.join(name);
            if exists_no_follow(&link) {
                report.record(link, false);
                continue;
            }
            symlink(&helper_path, &link)
                .with_context(|| format!("create symlink {} -> {}", link.display(), helper_path.display()))?;
            report.record(link, true);
        }
        Ok(())
    }

    fn install_inventory_config(
        &self,
        path: &Path,
        vault_key: &Path,
        monitor: &str,
        report: &mut InstallReport,
    ) -> Result<()> {
        if exists_no_follow(path) {
            let existing = read_inventory_config(path)?;
            report.identifier = existing.identifier().unwrap_or_default().to_string();
            report.token = existing.token().unwrap_or_default().to_string();
            report.record(path.to_path_buf(), false);
            return Ok(());
        }

        let identifier = machine_hash(&self.host.machine_id_path, "identifier", self.now)?;
        let token = machine_hash(&self.host.machine_id_path, "token", self.now)?;
        let mut headers = BTreeMap::new();
        headers.insert(HEADER_CONTENT_TYPE.to_string(), "application/json".to_string());
        headers.insert(HEADER_IDENTIFIER.to_string(), identifier.clone());
        headers.insert(HEADER_MONITOR_NAME.to_string(), monitor.to_string());
        headers.insert(HEADER_TOKEN.to_string(), token.clone());
        let config = InventoryFetchConfig {
            headers,
            key_file: vault_key.display().to_string(),
            retry_attempts: 3,
            retry_wait_seconds: 10,
            uri: INVENTORY_ENDPOINT.to_string(),
        };

        let created = write_new_file(path, to_json(&config)?.as_bytes(), 0o640)?;
        report.identifier = identifier;
        report.token = token;
        report.record(path.to_path_buf(), created);
        Ok(())
    }
}

pub fn read_inventory_config(path: &Path) -> Result<InventoryFetchConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut body = serde_json::to_string_pretty(value).context("serialize sample config")?;
    body.push('\n');
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::host_env;
    use chrono::TimeZone;
    use std::os::unix::fs::PermissionsExt;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().expect("timestamp")
    }

    fn mode(path: &Path) -> u32 {
        fs::metadata(path).expect("metadata").permissions().mode() & 0o777
    }

    struct Fixture {
        _temp: tempfile::TempDir,
        host: HostEnv,
        seed: PathBuf,
        script: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().expect("tempdir");
        let host = host_env(temp.path());
        let seed = temp.path().join("inventory.yaml");
        fs::write(&seed, "all:\n  hosts: {}\n").expect("write seed");
        let script = temp.path().join("dynamic-inventory.py");
        fs::write(&script, "#!/usr/bin/env python3\n").expect("write script");
        Fixture {
            _temp: temp,
            host,
            seed,
            script,
        }
    }

    fn sources<'a>(fixture: &'a Fixture, runner_config: Option<&'a str>) -> InstallSources<'a> {
        InstallSources {
            runner: b"runner",
            helper: b"#!/bin/sh\n",
            runner_config,
            dynamic_inventory: Some(&fixture.script),
            seed_inventory: Some(&fixture.seed),
            monitor: "pmm-1",
        }
    }

    #[test]
    fn install_materializes_all_artifacts() {
        let fixture = fixture();
        let report = HostInstaller::new(&fixture.host, now())
            .install(&sources(&fixture, Some("[defaults]\n")))
            .expect("install");

        let config_dir = fixture.host.config_dir();
        let bin_dir = fixture.host.bin_dir();
        assert_eq!(mode(&config_dir), 0o700);
        assert_eq!(mode(&bin_dir), 0o750);
        assert_eq!(mode(&config_dir.join(".vault-key")), 0o400);
        assert_eq!(mode(&bin_dir.join("ansible.sh")), 0o750);
        assert_eq!(mode(&config_dir.join("ansible.pex")), 0o550);
        assert_eq!(mode(&config_dir.join("secrets.yaml")), 0o600);
        assert_eq!(mode(&bin_dir.join("dynamic-inventory.py")), 0o550);
        assert_eq!(
            fs::read_to_string(fixture.host.home.join(".ansible.cfg")).expect("cfg"),
            "[defaults]\n"
        );
        for name in HELPER_LINKS {
            let target = fs::read_link(bin_dir.join(name)).expect("link");
            assert_eq!(target, bin_dir.join("ansible.sh"));
        }
        assert_eq!(
            fs::read_to_string(config_dir.join("secrets.yaml")).expect("secrets"),
            "all:\n  hosts: {}\n"
        );

        let fetch = read_inventory_config(&config_dir.join("inventory-config.json")).expect("read");
        assert_eq!(fetch.retry_attempts, 3);
        assert_eq!(fetch.retry_wait_seconds, 10);
        assert_eq!(fetch.uri, INVENTORY_ENDPOINT);
        assert_eq!(fetch.headers.get("Monitor-Name").map(String::as_str), Some("pmm-1"));
        assert_eq!(fetch.identifier(), Some(report.identifier.as_str()));
        assert_ne!(report.identifier, report.token);

        let connect: ConnectConfig = serde_json::from_str(
            &fs::read_to_string(config_dir.join("connect-py.json")).expect("connect"),
        )
        .expect("parse connect");
        assert_eq!(connect.server_address, CONNECT_SERVER_ADDRESS);
        assert!(connect.inventory.hosts.contains_key("pmm-1"));

        assert!(report.kept.is_empty());
        assert!(report.to_string().contains(&report.token));
    }

    #[test]
    fn second_install_overwrites_nothing() {
        let fixture = fixture();
        let installer = HostInstaller::new(&fixture.host, now());
        let first = installer
            .install(&sources(&fixture, Some("[defaults]\n")))
            .expect("first");

        let key_path = fixture.host.config_dir().join(".vault-key");
        let key = fs::read(&key_path).expect("key");
        fs::write(&fixture.seed, "changed\n").expect("rewrite seed");

        let later = Utc.timestamp_opt(1_800_000_000, 0).single().expect("timestamp");
        let second = HostInstaller::new(&fixture.host, later)
            .install(&sources(&fixture, Some("[changed]\n")))
            .expect("second");

        assert!(second.created.is_empty(), "created: {:?}", second.created);
        assert_eq!(fs::read(&key_path).expect("key"), key);
        assert_eq!(second.identifier, first.identifier);
        assert_eq!(second.token, first.token);
        assert_eq!(
            fs::read_to_string(fixture.host.config_dir().join("secrets.yaml")).expect("secrets"),
            "all:\n  hosts: {}\n"
        );
        assert_eq!(
            fs::read_to_string(fixture.host.home.join(".ansible.cfg")).expect("cfg"),
            "[defaults]\n"
        );
    }

    #[test]
    fn toggles_off_skip_optional_artifacts() {
        let fixture = fixture();
        let mut sources = sources(&fixture, None);
        sources.dynamic_inventory = None;
        HostInstaller::new(&fixture.host, now())
            .install(&sources)
            .expect("install");

        assert!(!fixture.host.home.join(".ansible.cfg").exists());
        assert!(!fixture.host.bin_dir().join("dynamic-inventory.py").exists());
    }

    #[test]
    fn missing_machine_identity_is_fatal() {
        let fixture = fixture();
        let host = HostEnv {
            machine_id_path: fixture.host.home.join("no-machine-id"),
            ..fixture.host.clone()
        };
        let err = HostInstaller::new(&host, now())
            .install(&sources(&fixture, None))
            .unwrap_err();
        assert!(format!("{err:#}").contains("unable to locate"));
    }

    #[test]
    fn existing_links_are_kept() {
        let fixture = fixture();
        let bin_dir = fixture.host.bin_dir();
        fs::create_dir_all(&bin_dir).expect("bin dir");
        symlink("/usr/bin/true", bin_dir.join("ansible")).expect("pre-link");

        HostInstaller::new(&fixture.host, now())
            .install(&sources(&fixture, None))
            .expect("install");
        assert_eq!(
            fs::read_link(bin_dir.join("ansible")).expect("link"),
            PathBuf::from("/usr/bin/true")
        );
    }

    #[test]
    fn existing_directories_keep_their_mode() {
        let fixture = fixture();
        let bin_dir = fixture.host.bin_dir();
        let config_dir = fixture.host.config_dir();
        for dir in [&bin_dir, &config_dir] {
            fs::create_dir_all(dir).expect("pre-create");
            fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).expect("chmod");
        }

        HostInstaller::new(&fixture.host, now())
            .install(&sources(&fixture, None))
            .expect("install");
        assert_eq!(mode(&bin_dir), 0o755);
        assert_eq!(mode(&config_dir), 0o755);
        assert!(bin_dir.join("ansible.sh").exists());
    }
}
