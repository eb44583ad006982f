//! Inventory resolution and default inventory synthesis.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::Environment;
use tracing::{debug, instrument};

use crate::core::inventory_spec::{filter_candidates, join_candidates, split_candidates};
use crate::core::types::RunConfiguration;
use crate::io::files::write_file;

/// File name of the synthesized inventory inside the workspace.
pub const SYNTHESIZED_INVENTORY: &str = "temp-inventory.yaml";

/// Inventory template shipped in the bundle, relative to the workspace.
pub const BUNDLE_INVENTORY_TEMPLATE: &str = "templates/defaultInventory.j2";

const BUILTIN_INVENTORY_TEMPLATE: &str = include_str!("templates/default_inventory.yaml.j2");

/// Renders the default inventory for a configuration.
pub trait InventoryTemplate {
    fn render_inventory(&self, config: &RunConfiguration) -> Result<Vec<u8>>;
}

/// Jinja template rendered with the configuration as its context.
#[derive(Debug, Clone)]
pub struct JinjaInventoryTemplate {
    name: String,
    source: String,
}

impl JinjaInventoryTemplate {
    pub fn builtin() -> Self {
        Self {
            name: "default-inventory".to_string(),
            source: BUILTIN_INVENTORY_TEMPLATE.to_string(),
        }
    }

    /// Prefer the bundle's template in `workspace`, fall back to the builtin.
    pub fn for_workspace(workspace: &Path) -> Result<Self> {
        let path = workspace.join(BUNDLE_INVENTORY_TEMPLATE);
        if !path.is_file() {
            debug!(path = %path.display(), "bundle inventory template missing, using builtin");
            return Ok(Self::builtin());
        }
        let source = fs::read_to_string(&path)
            .with_context(|| format!("unable to load template {}", path.display()))?;
        Ok(Self {
            name: BUNDLE_INVENTORY_TEMPLATE.to_string(),
            source,
        })
    }
}

impl InventoryTemplate for JinjaInventoryTemplate {
    fn render_inventory(&self, config: &RunConfiguration) -> Result<Vec<u8>> {
        let env = Environment::new();
        let template = env
            .template_from_named_str(&self.name, &self.source)
            .with_context(|| format!("failed to parse template {}", self.name))?;
        let mut rendered = template
            .render(config)
            .with_context(|| format!("failed to render template {}", self.name))?;
        if !rendered.ends_with('\n') {
            rendered.push('\n');
        }
        Ok(rendered.into_bytes())
    }
}

/// Outcome of [`resolve_inventory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInventory {
    /// Comma-joined paths to hand to the runner; never empty.
    pub effective: String,
    /// Path written when no candidate existed.
    pub synthesized: Option<PathBuf>,
    /// Set when `effective` differs from the normalized candidate spec.
    pub warning: Option<String>,
}

impl ResolvedInventory {
    pub fn paths(&self) -> Vec<&str> {
        split_candidates(&self.effective)
    }
}

/// Keep the candidates of `candidate_spec` that exist on disk, in order.
///
/// When none exist, render the default inventory to
/// `workspace/temp-inventory.yaml` and use that alone. Repeated calls against
/// the same disk state return the same effective spec.
#[instrument(skip_all, fields(candidates = %candidate_spec))]
pub fn resolve_inventory<T: InventoryTemplate>(
    candidate_spec: &str,
    workspace: &Path,
    config: &RunConfiguration,
    template: &T,
) -> Result<ResolvedInventory> {
    let existing = filter_candidates(candidate_spec, |path| {
        let found = path.exists();
        if !found {
            debug!(path = %path.display(), "ignoring inventory path");
        }
        found
    });

    let (effective, synthesized) = if existing.is_empty() {
        let path = workspace.join(SYNTHESIZED_INVENTORY);
        let contents = template.render_inventory(config)?;
        write_file(&path, &contents, 0o640)?;
        debug!(path = %path.display(), "synthesized default inventory");
        (path.display().to_string(), Some(path))
    } else {
        (join_candidates(&existing), None)
    };

    let requested = join_candidates(&split_candidates(candidate_spec));
    let warning = (effective != requested).then(|| {
        format!("unable to use '{candidate_spec}' as the inventory, using '{effective}'")
    });

    Ok(ResolvedInventory {
        effective,
        synthesized,
        warning,
    })
}
