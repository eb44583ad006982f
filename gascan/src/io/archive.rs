//! Extraction of the embedded automation bundle.
//!
//! The bundle is a gzip-compressed tar stream. Every entry is classified by
//! [`classify_entry`] before anything touches the disk, so no entry can
//! create a filesystem object outside the destination directory.

use std::io::Read;
use std::os::unix::fs::symlink;
use std::path::Path;

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::{debug, info, instrument, warn};

use crate::core::archive_path::{EntryDisposition, classify_entry, is_reserved};
use crate::io::files::{create_dir, write_file};

/// Directories: owner and group only.
pub const DIR_MODE: u32 = 0o750;
/// Regular files: owner read/write, group read.
pub const FILE_MODE: u32 = 0o640;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Tally of what an extraction did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub directories: usize,
    pub files: usize,
    pub symlinks: usize,
    /// Entries rejected for escaping the destination.
    pub unsafe_entries: usize,
    /// Entries dropped by the ad-hoc allow-list, the reserved name, or an
    /// unsupported entry type.
    pub skipped: usize,
}

/// Stream `bundle` into `dest`.
///
/// With `adhoc` set, only the allow-listed subtrees are written. A corrupt
/// stream or a symlink that cannot be created aborts the extraction; there
/// is no partial recovery.
#[instrument(skip_all, fields(dest = %dest.display(), adhoc))]
pub fn extract_bundle(bundle: &[u8], dest: &Path, adhoc: bool) -> Result<ExtractReport> {
    if !bundle.starts_with(&GZIP_MAGIC) {
        bail!("bundle is not a gzip stream ({} bytes)", bundle.len());
    }

    let mut archive = Archive::new(GzDecoder::new(bundle));
    let mut report = ExtractReport::default();

    for entry in archive.entries().context("read bundle")? {
        let mut entry = entry.context("read bundle entry")?;
        let entry_type = entry.header().entry_type();
        let name = entry
            .path()
            .context("decode bundle entry name")?
            .into_owned();
        let link = entry
            .link_name()
            .context("decode bundle link name")?
            .map(|target| target.into_owned());

        let (relative, link_target) = match classify_entry(&name, link.as_deref(), adhoc) {
            EntryDisposition::Unsafe => {
                warn!(name = %name.display(), "unexpected path found during extraction, skipping");
                report.unsafe_entries += 1;
                continue;
            }
            EntryDisposition::NotNeeded => {
                debug!(name = %name.display(), "skipping due to adhoc mode");
                report.skipped += 1;
                continue;
            }
            EntryDisposition::Materialize {
                relative,
                link_target,
            } => (relative, link_target),
        };
        let target = dest.join(&relative);

        match entry_type {
            EntryType::Directory => {
                debug!(path = %target.display(), "directory");
                create_dir(&target, DIR_MODE)?;
                report.directories += 1;
            }
            EntryType::Regular | EntryType::Continuous => {
                let expected = entry.size();
                let mut contents = Vec::new();
                entry
                    .read_to_end(&mut contents)
                    .with_context(|| format!("read bundle entry {}", name.display()))?;
                if contents.len() as u64 != expected {
                    bail!(
                        "read bundle entry {}: stream ended after {} of {expected} bytes",
                        name.display(),
                        contents.len()
                    );
                }
                if is_reserved(&relative) {
                    debug!(path = %target.display(), "ignoring reserved entry");
                    report.skipped += 1;
                    continue;
                }
                debug!(path = %target.display(), "file");
                write_file(&target, &contents, FILE_MODE)?;
                report.files += 1;
            }
            EntryType::Symlink => {
                let Some(link_target) = link_target else {
                    bail!("symlink {} has no target", name.display());
                };
                debug!(path = %target.display(), target = %link_target.display(), "symlink");
                if let Some(parent) = target.parent()
                    && !parent.exists()
                {
                    create_dir(parent, DIR_MODE)?;
                }
                symlink(&link_target, &target).with_context(|| {
                    format!(
                        "create symlink {} -> {}",
                        target.display(),
                        link_target.display()
                    )
                })?;
                report.symlinks += 1;
            }
            other => {
                debug!(name = %name.display(), entry_type = ?other, "unsupported entry type, skipping");
                report.skipped += 1;
            }
        }
    }

    info!(
        directories = report.directories,
        files = report.files,
        symlinks = report.symlinks,
        unsafe_entries = report.unsafe_entries,
        skipped = report.skipped,
        "bundle extracted"
    );
    Ok(report)
}
