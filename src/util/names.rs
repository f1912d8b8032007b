//! Identifier sanitizing for names that come from simulation data.
//!
//! Character, asset, alias and attribute names are free-form strings in
//! the simulation cache. Prim and field names must be identifiers:
//! ASCII alphanumerics and `_`, not starting with a digit.

use std::collections::HashSet;

/// Turn a free-form string into a valid identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, a leading digit is
/// prefixed with `_`, and an empty input yields `"_"`.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            out.push('_');
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

/// Return `base` or the first `base_N` (N = 1, 2, ...) not yet in `taken`,
/// and record it.
pub fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("{base}_{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
