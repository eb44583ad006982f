//! Comma-joined inventory specs.

use std::path::Path;

/// Split a comma-joined spec into candidate paths, dropping blank items.
pub fn split_candidates(spec: &str) -> Vec<&str> {
    spec.split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .collect()
}

/// Keep the candidates for which `exists` holds, preserving order.
pub fn filter_candidates<F>(spec: &str, exists: F) -> Vec<String>
where
    F: Fn(&Path) -> bool,
{
    split_candidates(spec)
        .into_iter()
        .filter(|candidate| exists(Path::new(candidate)))
        .map(str::to_string)
        .collect()
}

pub fn join_candidates<S: AsRef<str>>(paths: &[S]) -> String {
    paths
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}
