//! Mode-aware file and directory writes.

use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Create `path` and missing parents with `mode`, then pin `path` to `mode`.
pub fn create_dir(path: &Path, mode: u32) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .with_context(|| format!("create directory {}", path.display()))?;
    fs::set_permissions(path, Permissions::from_mode(mode))
        .with_context(|| format!("set permissions on {}", path.display()))
}

/// Create `path` with `mode` unless a directory is already there.
///
/// An existing directory keeps its permissions. Returns whether it was created.
pub fn create_dir_if_missing(path: &Path, mode: u32) -> Result<bool> {
    if path.is_dir() {
        debug!(path = %path.display(), "directory present, keeping");
        return Ok(false);
    }
    create_dir(path, mode)?;
    Ok(true)
}

/// Write `contents` to `path` in one call and pin the file to `mode`.
///
/// Missing parent directories are created owner/group only.
pub fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    debug!(path = %path.display(), mode = %format!("{mode:o}"), "writing file");
    ensure_parent(path)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("write file {}", path.display()))?;
    fs::set_permissions(path, Permissions::from_mode(mode))
        .with_context(|| format!("set permissions on {}", path.display()))
}

/// Create `path` only if nothing exists there yet.
///
/// Returns `false` without touching the existing file otherwise.
pub fn write_new_file(path: &Path, contents: &[u8], mode: u32) -> Result<bool> {
    ensure_parent(path)?;
    let mut file = match OpenOptions::new().write(true).create_new(true).mode(mode).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "already present, keeping");
            return Ok(false);
        }
        Err(err) => return Err(err).with_context(|| format!("create {}", path.display())),
    };
    file.write_all(contents)
        .with_context(|| format!("write file {}", path.display()))?;
    fs::set_permissions(path, Permissions::from_mode(mode))
        .with_context(|| format!("set permissions on {}", path.display()))?;
    Ok(true)
}

/// True if anything, including a dangling symlink, exists at `path`.
pub fn exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            DirBuilder::new()
                .recursive(true)
                .mode(0o750)
                .create(parent)
                .with_context(|| format!("create directory {}", parent.display()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).expect("metadata").permissions().mode() & 0o777
    }

    #[test]
    fn write_file_sets_exact_mode() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/file.txt");
        write_file(&path, b"hello", 0o640).expect("write");
        assert_eq!(fs::read(&path).expect("read"), b"hello");
        assert_eq!(mode_of(&path), 0o640);
    }

    #[test]
    fn write_new_file_never_overwrites() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("key");
        assert!(write_new_file(&path, b"first", 0o400).expect("first write"));
        assert!(!write_new_file(&path, b"second", 0o400).expect("second write"));
        assert_eq!(fs::read(&path).expect("read"), b"first");
        assert_eq!(mode_of(&path), 0o400);
    }

    #[test]
    fn create_dir_restricts_world_access() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a/b");
        create_dir(&path, 0o750).expect("create");
        assert!(path.is_dir());
        assert_eq!(mode_of(&path), 0o750);
    }

    #[test]
    fn create_dir_if_missing_leaves_existing_mode() {
        let temp = tempfile::tempdir().expect("tempdir");
        let existing = temp.path().join("bin");
        fs::create_dir(&existing).expect("mkdir");
        fs::set_permissions(&existing, Permissions::from_mode(0o755)).expect("chmod");
        assert!(!create_dir_if_missing(&existing, 0o750).expect("existing"));
        assert_eq!(mode_of(&existing), 0o755);

        let fresh = temp.path().join("config/gascan");
        assert!(create_dir_if_missing(&fresh, 0o700).expect("fresh"));
        assert_eq!(mode_of(&fresh), 0o700);
    }
}
