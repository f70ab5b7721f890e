//! PID helpers: validation, namespace extraction and directory-name decoding.

use std::path::Path;
use std::sync::OnceLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

pub const PID_PATTERN: &str = r"^[A-Za-z0-9]+:[A-Za-z0-9\-\._~]+$";

fn pid_regex() -> Option<&'static Regex> {
    static PID: OnceLock<Option<Regex>> = OnceLock::new();
    PID.get_or_init(|| Regex::new(PID_PATTERN).ok()).as_ref()
}

/// True if `candidate` has the `namespace:localname` shape Fedora accepts.
pub fn is_valid_pid(candidate: &str) -> bool {
    pid_regex().is_some_and(|re| re.is_match(candidate))
}

/// Namespace part of a PID (everything before the first `:`).
pub fn namespace_of(pid: &str) -> Option<&str> {
    pid.split_once(':').map(|(ns, _)| ns).filter(|ns| !ns.is_empty())
}

/// `:` is not allowed in RELS-EXT predicate local names, so PIDs embedded in
/// predicates are written with `_` instead.
pub fn uri_safe(pid: &str) -> String {
    pid.replace(':', "_")
}

/// Decode a directory name the way form-encoded values are decoded:
/// `+` becomes a space and `%XX` escapes become bytes.
pub fn url_decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Decoded final component of `dir`, or an empty string for a root path.
pub fn decoded_dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| url_decode(&name.to_string_lossy()))
        .unwrap_or_default()
}
