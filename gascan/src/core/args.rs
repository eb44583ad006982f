//! Argument vectors for the bundled runner.

use crate::core::inventory_spec::split_candidates;
use crate::core::types::RunConfiguration;

/// One `--inventory <path>` pair per resolved inventory path.
///
/// The runner reads a comma inside a single `--inventory` value as a host
/// list, so multiple paths are never passed joined.
pub fn inventory_args(inventory: &str) -> Vec<String> {
    split_candidates(inventory)
        .into_iter()
        .flat_map(|path| ["--inventory".to_string(), path.to_string()])
        .collect()
}

/// Options for playbook runs, shared by the test and deploy stages.
///
/// The playbook path itself is prepended by the caller.
pub fn playbook_args(config: &RunConfiguration, ask_become_pass: bool, inventory: &str) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(tags) = config.tags.as_deref().filter(|tags| !tags.is_empty()) {
        args.extend(["--tags".to_string(), tags.to_string()]);
    }
    if let Some(skip) = config.skip_tags.as_deref().filter(|skip| !skip.is_empty()) {
        args.extend(["--skip-tags".to_string(), skip.to_string()]);
    }
    if let Some(limit) = config.limit.as_deref().filter(|limit| !limit.is_empty()) {
        args.extend(["--limit".to_string(), limit.to_string()]);
    }
    if ask_become_pass {
        args.push("--ask-become-pass".to_string());
    }
    args.extend(inventory_args(inventory));
    args.extend(config.extra_args.iter().cloned());
    args
}

pub fn adhoc_args(config: &RunConfiguration, inventory: &str) -> Vec<String> {
    let mut args = inventory_args(inventory);
    args.extend(config.extra_args.iter().cloned());
    args
}

/// `--list` unless the operator supplied their own query arguments.
pub fn inventory_query_args(config: &RunConfiguration, inventory: &str) -> Vec<String> {
    let mut args = inventory_args(inventory);
    if config.extra_args.is_empty() {
        args.push("--list".to_string());
    } else {
        args.extend(config.extra_args.iter().cloned());
    }
    args
}

/// Render `args` as a single shell-safe command line fragment.
pub fn shell_join<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| shell_escape(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_escape(input: &str) -> String {
    if !input.is_empty()
        && input
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '=' | ','))
    {
        return input.to_string();
    }
    let mut escaped = String::from("'");
    for ch in input.chars() {
        if ch == '\'' {
            escaped.push_str("'\"'\"'");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}
