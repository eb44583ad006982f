//! Test-only helpers: in-memory bundles, scripted process launches, and
//! isolated host environments.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{Builder, EntryType, Header};

use crate::io::identity::HostEnv;
use crate::io::process::{LaunchRequest, Launcher, RunOutcome};

/// One entry of a synthetic bundle.
///
/// Names are written into the raw header, so traversal names like
/// `../escape.yaml` survive into the archive.
#[derive(Debug, Clone)]
pub enum BundleEntry {
    Dir(String),
    File(String, Vec<u8>),
    Symlink(String, String),
}

impl BundleEntry {
    pub fn dir(name: &str) -> Self {
        BundleEntry::Dir(name.to_string())
    }

    pub fn file(name: &str, contents: &str) -> Self {
        BundleEntry::File(name.to_string(), contents.as_bytes().to_vec())
    }

    pub fn symlink(name: &str, target: &str) -> Self {
        BundleEntry::Symlink(name.to_string(), target.to_string())
    }
}

/// Build a gzip-compressed tarball from `entries`.
pub fn build_bundle(entries: &[BundleEntry]) -> Vec<u8> {
    let mut builder = Builder::new(Vec::new());
    for entry in entries {
        let mut header = Header::new_gnu();
        let (name, data, link): (&str, &[u8], Option<&str>) = match entry {
            BundleEntry::Dir(name) => {
                header.set_entry_type(EntryType::Directory);
                header.set_mode(0o755);
                (name.as_str(), &[][..], None)
            }
            BundleEntry::File(name, contents) => {
                header.set_entry_type(EntryType::Regular);
                header.set_mode(0o644);
                (name.as_str(), contents.as_slice(), None)
            }
            BundleEntry::Symlink(name, target) => {
                header.set_entry_type(EntryType::Symlink);
                header.set_mode(0o777);
                (name.as_str(), &[][..], Some(target.as_str()))
            }
        };
        write_raw(&mut header.as_old_mut().name, name);
        if let Some(link) = link {
            write_raw(&mut header.as_old_mut().linkname, link);
        }
        header.set_size(data.len() as u64);
        header.set_mtime(0);
        header.set_cksum();
        builder.append(&header, data).expect("append entry");
    }
    let tar = builder.into_inner().expect("finish tar");
    gzip(&tar)
}

/// Gzip arbitrary bytes.
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

fn write_raw(field: &mut [u8; 100], value: &str) {
    assert!(value.len() < field.len(), "name too long for raw header: {value}");
    field.fill(0);
    field[..value.len()].copy_from_slice(value.as_bytes());
}

/// A bundle shaped like the real one: playbooks, roles, templates, plugins.
pub fn sample_bundle() -> Vec<u8> {
    build_bundle(&[
        BundleEntry::dir("automation/"),
        BundleEntry::file(
            "automation/default.cfg",
            "[defaults]\ninventory_plugins = ./plugins/inventory\n",
        ),
        BundleEntry::file("automation/ping.yaml", "---\n- hosts: all\n"),
        BundleEntry::file("automation/site.yaml", "---\n- hosts: monitor\n"),
        BundleEntry::dir("automation/templates/"),
        BundleEntry::file(
            "automation/templates/defaultInventory.j2",
            "all:\n  hosts:\n    {{ monitor }}:\n",
        ),
        BundleEntry::file("automation/plugins/inventory/dyn.py", "print()\n"),
        BundleEntry::file("automation/roles/monitor/tasks/main.yaml", "---\n"),
        BundleEntry::symlink("automation/main.yaml", "site.yaml"),
    ])
}

/// Launcher that records every request and replays scripted outcomes.
///
/// Once the script is exhausted every launch succeeds.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    outcomes: RefCell<VecDeque<RunOutcome>>,
    requests: RefCell<Vec<LaunchRequest>>,
}

impl RecordingLauncher {
    pub fn new(outcomes: Vec<RunOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.borrow().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, request: &LaunchRequest) -> RunOutcome {
        self.requests.borrow_mut().push(request.clone());
        self.outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(RunOutcome::success)
    }
}

/// Host environment rooted entirely under `root`, with a machine id file.
pub fn host_env(root: &Path) -> HostEnv {
    let home = root.join("home");
    std::fs::create_dir_all(&home).expect("create home");
    let machine_id = root.join("machine-id");
    std::fs::write(&machine_id, "0123456789abcdef0123456789abcdef\n").expect("write machine id");
    HostEnv {
        home,
        machine_id_path: machine_id,
        default_inventory_opt_in: None,
        become_password_provided: false,
    }
}
