//! Deterministic selection of what an invocation does.
//!
//! [`resolve_mode`] is a pure function of its inputs: it never touches the
//! filesystem, the environment or the clock. Informational queries (version,
//! listing, hash) are returned as decisions for the caller to carry out.

use anyhow::{Result, bail};

use crate::core::registry::AutomationRegistry;
use crate::core::run_mode::{Facet, RunMode};
use crate::core::truthy::opt_in_default_on;

/// Inputs the mode engine needs, already ingested from flags and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeRequest {
    pub show_version: bool,
    pub list_automations: bool,
    pub generate_hash: bool,
    pub test: bool,
    pub skip_configure: bool,
    pub skip_deploy: bool,
    pub inventory_query: bool,
    pub extract: bool,
    pub adhoc: bool,
    /// An inventory was supplied by flag or environment.
    pub explicit_inventory: bool,
    /// Selected automation name, e.g. `site.yaml`.
    pub automation: String,
    /// Number of trailing pass-through arguments.
    pub passthrough_args: usize,
    /// Raw value of the default-inventory opt-in signal (`None` when unset).
    pub default_inventory_opt_in: Option<String>,
}

/// What the invocation should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeDecision {
    /// Print version facts and exit 0.
    ShowVersion,
    /// Print the automation registry and exit 0.
    ListAutomations,
    /// Print a machine-derived hash and exit 0.
    GenerateHash,
    /// Extract the bundle and perform the selected facets.
    Run(RunMode),
}

/// Compute the decision for `request`.
///
/// Rules are applied in order and later rules may override earlier ones:
/// informational queries first, then automation validation, then the
/// combinable facets, then the terminal facets (inventory query, extract,
/// ad-hoc) which each replace the mode entirely.
pub fn resolve_mode(request: &ModeRequest, registry: &AutomationRegistry) -> Result<ModeDecision> {
    if request.show_version {
        return Ok(ModeDecision::ShowVersion);
    }
    if request.list_automations {
        return Ok(ModeDecision::ListAutomations);
    }
    if !request.adhoc && !registry.contains(&request.automation) {
        bail!(
            "invalid playbook '{}', use --list-playbooks to see the available playbooks",
            request.automation
        );
    }
    if request.generate_hash {
        return Ok(ModeDecision::GenerateHash);
    }

    let mut mode = RunMode::empty();
    if request.test {
        mode = mode.with(Facet::Test);
    }
    if !request.skip_configure
        && !request.explicit_inventory
        && opt_in_default_on(request.default_inventory_opt_in.as_deref())
    {
        mode = mode.with(Facet::Config);
    }
    if !request.skip_deploy {
        mode = mode.with(Facet::Deploy);
    }
    if request.inventory_query {
        mode = mode.replace_with(Facet::InventoryQuery);
    }
    if request.extract {
        mode = mode.replace_with(Facet::Extract);
    }
    if request.adhoc {
        if request.passthrough_args == 0 {
            bail!("adhoc mode requires at least one argument after '--'");
        }
        mode = mode.replace_with(Facet::Adhoc);
    }

    Ok(ModeDecision::Run(mode))
}
