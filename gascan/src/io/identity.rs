//! Host facts and machine-derived identifiers.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Default location of the machine identity.
pub const MACHINE_ID_PATH: &str = "/etc/machine-id";

/// Environment variable holding the default-inventory opt-in toggle.
pub const DEFAULT_INVENTORY_ENV: &str = "GASCAN_DEFAULT_INVENTORY";

/// Environment variables that supply a become password to the runner.
pub const BECOME_PASSWORD_ENVS: [&str; 2] = ["ANSIBLE_BECOME_PASSWORD_FILE", "ANSIBLE_BECOME_PASS"];

/// Process environment captured once at startup and passed explicitly to
/// every component that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnv {
    pub home: PathBuf,
    pub machine_id_path: PathBuf,
    /// Raw value of [`DEFAULT_INVENTORY_ENV`], `None` when unset.
    pub default_inventory_opt_in: Option<String>,
    /// A become password reaches the runner through its own environment.
    pub become_password_provided: bool,
}

impl HostEnv {
    pub fn from_process() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("unable to determine home directory"))?;
        let become_password_provided = BECOME_PASSWORD_ENVS
            .iter()
            .any(|name| env::var_os(name).is_some_and(|value| !value.is_empty()));
        Ok(Self {
            home,
            machine_id_path: PathBuf::from(MACHINE_ID_PATH),
            default_inventory_opt_in: env::var(DEFAULT_INVENTORY_ENV).ok(),
            become_password_provided,
        })
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.home.join("bin")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.home.join(".config").join("gascan")
    }
}

/// SHA-256 over the machine identity, `label` and `now`, hex encoded.
///
/// The label keeps identifiers derived in the same instant distinct. An
/// unreadable or empty identity source is an error: there is no fallback.
pub fn machine_hash(machine_id_path: &Path, label: &str, now: DateTime<Utc>) -> Result<String> {
    let machine_id = fs::read_to_string(machine_id_path)
        .with_context(|| format!("unable to locate {}", machine_id_path.display()))?;
    let machine_id = machine_id.trim();
    if machine_id.is_empty() {
        bail!("unable to locate {}: file is empty", machine_id_path.display());
    }

    let mut hasher = Sha256::new();
    hasher.update(machine_id.as_bytes());
    hasher.update(b"-");
    hasher.update(label.as_bytes());
    hasher.update(b"-");
    hasher.update(now.to_rfc3339().as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
