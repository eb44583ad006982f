//! Artifacts and facts fixed at build time.

use std::fmt;

use crate::core::registry::AutomationRegistry;
use crate::core::truthy::opt_in_default_on;

const BUNDLE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/bundle.tgz"));
const RUNNER: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/runner.pex"));
const AUTOMATIONS: &str = include_str!(concat!(env!("OUT_DIR"), "/automations.txt"));
const HELPER: &[u8] = include_bytes!("../assets/runner-helper.sh");

/// Versions reported by `--version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFacts {
    pub tool: String,
    pub bundle: String,
    pub runner: String,
    pub interpreter: String,
}

impl fmt::Display for VersionFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "gascan version: {}", self.tool)?;
        writeln!(f, "bundle version: {}", self.bundle)?;
        writeln!(f, "ansible version: {}", self.runner)?;
        write!(f, "python version: {}", self.interpreter)
    }
}

/// Everything embedded in the executable, passed explicitly to the stages
/// that consume it.
#[derive(Debug, Clone)]
pub struct Payload {
    pub bundle: Vec<u8>,
    pub runner: Vec<u8>,
    /// Dispatch script installed into the operator's bin directory.
    pub helper: Vec<u8>,
    pub automations: AutomationRegistry,
    pub versions: VersionFacts,
    /// Comma-separated inventory cache locations.
    pub cache_paths: String,
    /// Install the runner configuration as `~/.ansible.cfg` on extract.
    pub extract_runner_config: bool,
    /// Install the dynamic inventory script on extract.
    pub extract_dynamic_inventory: bool,
}

impl Payload {
    pub fn embedded() -> Self {
        Self {
            bundle: BUNDLE.to_vec(),
            runner: RUNNER.to_vec(),
            helper: HELPER.to_vec(),
            automations: AutomationRegistry::from_comma_list(AUTOMATIONS),
            versions: VersionFacts {
                tool: env!("GASCAN_BUILD_RELEASE_VERSION").to_string(),
                bundle: env!("GASCAN_BUILD_BUNDLE_VERSION").to_string(),
                runner: env!("GASCAN_BUILD_RUNNER_VERSION").to_string(),
                interpreter: env!("GASCAN_BUILD_PYTHON_VERSION").to_string(),
            },
            cache_paths: env!("GASCAN_BUILD_CACHE_PATHS").to_string(),
            extract_runner_config: opt_in_default_on(Some(env!("GASCAN_BUILD_EXTRACT_RUNNER_CONFIG"))),
            extract_dynamic_inventory: opt_in_default_on(Some(env!(
                "GASCAN_BUILD_EXTRACT_DYNAMIC_INVENTORY"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_facts_print_one_per_line() {
        let facts = VersionFacts {
            tool: "1.2.3".to_string(),
            bundle: "b1".to_string(),
            runner: "2.16".to_string(),
            interpreter: "3.11".to_string(),
        };
        let text = facts.to_string();
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("gascan version: 1.2.3\n"));
        assert!(text.ends_with("python version: 3.11"));
    }

    #[test]
    fn embedded_bundle_is_gzip() {
        let payload = Payload::embedded();
        assert!(payload.bundle.starts_with(&[0x1f, 0x8b]));
        assert!(payload.helper.starts_with(b"#!/bin/sh"));
        assert!(!payload.cache_paths.is_empty());
    }
}
