//! Parsing for opt-in toggles read from the environment or build inputs.

/// Canonical truthy vocabulary: unset, empty, `1`, `yes` and `true`.
///
/// Matching trims whitespace and ignores ASCII case. Every other value,
/// including `0`, `no` and `false`, is false.
pub fn opt_in_default_on(value: Option<&str>) -> bool {
    let Some(value) = value else {
        return true;
    };
    let value = value.trim().trim_matches('"');
    value.is_empty()
        || value == "1"
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("true")
}
