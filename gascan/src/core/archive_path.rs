//! Path policy for bundle entries.
//!
//! Decides, without touching the filesystem, where an archive entry lands
//! relative to the destination directory, or whether it is dropped.

use std::path::{Component, Path, PathBuf};

/// Top-level directory every bundle entry lives under.
pub const BUNDLE_PREFIX: &str = "automation";

/// Entry name written by some tar implementations that carries no content.
pub const RESERVED_METADATA_ENTRY: &str = "pax_global_header";

/// First path components materialized in ad-hoc mode.
pub const ADHOC_ALLOW_LIST: [&str; 3] = ["plugins", "templates", "default.cfg"];

/// What to do with one archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDisposition {
    /// Name or link target would escape the destination directory.
    Unsafe,
    /// Outside the ad-hoc allow-list.
    NotNeeded,
    /// Write the entry at `relative` (empty for the destination itself).
    Materialize {
        relative: PathBuf,
        link_target: Option<PathBuf>,
    },
}

/// Classify an entry from its raw name and optional symlink target.
pub fn classify_entry(name: &Path, link_target: Option<&Path>, adhoc: bool) -> EntryDisposition {
    if escapes(name) || link_target.is_some_and(escapes) {
        return EntryDisposition::Unsafe;
    }

    let relative = strip_bundle_prefix(name);
    if adhoc && !allowed_in_adhoc(&relative) {
        return EntryDisposition::NotNeeded;
    }

    EntryDisposition::Materialize {
        relative,
        link_target: link_target.map(strip_bundle_prefix),
    }
}

/// True when `path` is absolute or has a `..` component.
pub fn escapes(path: &Path) -> bool {
    path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Drop a leading [`BUNDLE_PREFIX`] component and any `.` components.
pub fn strip_bundle_prefix(path: &Path) -> PathBuf {
    let mut components = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .peekable();
    if components
        .peek()
        .is_some_and(|first| first.as_os_str() == BUNDLE_PREFIX)
    {
        components.next();
    }
    components.collect()
}

/// The destination root itself is always allowed; everything else must sit
/// under an allow-listed first component.
pub fn allowed_in_adhoc(relative: &Path) -> bool {
    match relative.components().next() {
        None => true,
        Some(first) => ADHOC_ALLOW_LIST
            .iter()
            .any(|allowed| first.as_os_str() == *allowed),
    }
}

pub fn is_reserved(relative: &Path) -> bool {
    relative.as_os_str() == RESERVED_METADATA_ENTRY
}
