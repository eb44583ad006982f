//! Ephemeral workspace for one invocation.
//!
//! A workspace is opened once and finalized once; [`Workspace::finalize`]
//! consumes it. A workspace that is never finalized (for example after a
//! fatal error) stays on disk.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

const WORKSPACE_PREFIX: &str = "gascan-";

/// Uniquely named working directory owned by this invocation.
#[derive(Debug, PartialEq, Eq)]
pub struct Workspace {
    path: PathBuf,
}

/// What finalization did with the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalization {
    Removed,
    /// Removal was attempted and failed; the OS reclaims temp space later.
    RemovalFailed,
    Preserved,
}

impl Workspace {
    /// Create a fresh directory under `base`, or the platform temp directory.
    pub fn open(base: Option<&Path>) -> Result<Self> {
        let base = base.map_or_else(env::temp_dir, Path::to_path_buf);
        fs::create_dir_all(&base)
            .with_context(|| format!("create workspace parent {}", base.display()))?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&base)
            .with_context(|| format!("create workspace in {}", base.display()))?;
        let path = dir.keep();
        debug!(path = %path.display(), "workspace opened");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace when `remove` is set, otherwise leave it in place.
    ///
    /// Removal is best-effort: a failure is logged, never returned.
    pub fn finalize(self, remove: bool) -> Finalization {
        if !remove {
            info!(path = %self.path.display(), "workspace left in place");
            return Finalization::Preserved;
        }
        debug!(path = %self.path.display(), "cleaning workspace");
        match fs::remove_dir_all(&self.path) {
            Ok(()) => Finalization::Removed,
            Err(err) => {
                warn!(path = %self.path.display(), err = %err, "unable to remove workspace");
                Finalization::RemovalFailed
            }
        }
    }
}
