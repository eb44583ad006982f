//! Removal of cached inventory data left by earlier runs.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};

use crate::core::inventory_spec::split_candidates;

/// Expand one cache entry to a concrete path.
///
/// `~/` expands to `home`; a bare `~` would target the whole home directory
/// and is refused. A trailing `*` selects the first sibling, in name order,
/// that starts with the given prefix. `Ok(None)` means nothing matched.
pub fn expand_cache_path(entry: &str, home: &Path) -> Result<Option<PathBuf>> {
    if entry == "~" || entry == "~/" {
        bail!("cache path list contains the home directory itself");
    }
    let path = match entry.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(entry),
    };

    let Some(prefix) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix('*'))
    else {
        return Ok(Some(path));
    };
    let parent = path.parent().unwrap_or_else(|| Path::new("/"));
    let entries = match fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("read directory {}", parent.display())),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read directory {}", parent.display()))?;
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    let first = matches.into_iter().next();
    if let Some(found) = &first {
        debug!(entry, path = %found.display(), "expanded cache path");
    }
    Ok(first)
}

/// Remove every path in the comma-separated `spec`.
///
/// Missing paths are not an error. Stops at the first entry that cannot be
/// expanded or removed.
#[instrument(skip_all, fields(spec = %spec))]
pub fn clear_inventory_cache(spec: &str, home: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for entry in split_candidates(spec) {
        let Some(path) = expand_cache_path(entry, home)? else {
            continue;
        };
        if remove_path(&path)? {
            debug!(path = %path.display(), "removed inventory cache");
            removed.push(path);
        }
    }
    Ok(removed)
}

fn remove_path(path: &Path) -> Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err).with_context(|| format!("inspect {}", path.display())),
    };
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.with_context(|| format!("unable to remove {}", path.display()))?;
    Ok(true)
}
