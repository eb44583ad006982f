//! Rewriting of relative paths in the runner configuration.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[\s=,:])\./").expect("relative path pattern should be valid"));
static HOME_RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[\s=,:])~/").expect("home path pattern should be valid"));

/// Replace `./` with `base_dir/` and `~/` with `home/` where either starts a
/// value (line start, after whitespace, `=`, `,` or `:`).
///
/// Other occurrences, such as the tail of `../`, are left alone. The output
/// always ends with a newline.
pub fn absolutize(contents: &str, base_dir: &str, home: &str) -> String {
    let base = base_dir.trim_end_matches('/');
    let home = home.trim_end_matches('/');
    let mut out = String::with_capacity(contents.len());
    for line in contents.lines() {
        let line = RELATIVE.replace_all(line, |caps: &Captures<'_>| format!("{}{base}/", &caps[1]));
        let line =
            HOME_RELATIVE.replace_all(&line, |caps: &Captures<'_>| format!("{}{home}/", &caps[1]));
        out.push_str(&line);
        out.push('\n');
    }
    out
}
