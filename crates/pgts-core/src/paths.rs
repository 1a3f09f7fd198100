//! Object Explorer path helpers.
//!
//! PGTS session ids end with a trailing `/` (needed for its key lookups),
//! which produces `//` once a node path is appended. Every path that enters
//! the tree goes through [`normalize_path`] so lookups compare equal.

use crate::constants::OBJECT_EXPLORER_SCHEME;

/// Drop a single trailing `/`.
pub fn trim_uri(uri: &str) -> &str {
    uri.strip_suffix('/').unwrap_or(uri)
}

/// Collapse runs of `/` after the `objectexplorer://` scheme prefix.
///
/// Strings without the prefix are returned unchanged.
pub fn normalize_path(path: &str) -> String {
    let Some(rest) = path.strip_prefix(OBJECT_EXPLORER_SCHEME) else {
        return path.to_owned();
    };

    let mut out = String::with_capacity(path.len());
    out.push_str(OBJECT_EXPLORER_SCHEME);
    let mut prev_slash = false;
    for ch in rest.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    out
}

/// Append `segment` to `parent` and normalize.
pub fn join_path(parent: &str, segment: &str) -> String {
    normalize_path(&format!("{parent}/{segment}"))
}
