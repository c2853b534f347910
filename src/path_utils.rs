//! Cross-platform path utilities for standalone
//!
//! Module ids and package roots are project-relative paths stored with forward
//! slashes, so they compare equal regardless of the host platform. These helpers
//! normalize such paths lexically, without touching the filesystem.

use std::path::Path;

/// File extensions of compiled addons and shared libraries
const NATIVE_EXTENSIONS: &[&str] = &["node", "so", "dylib", "dll"];

/// Convert a path to a forward-slash string.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use standalone::path_utils::to_forward_slashes;
///
/// assert_eq!(to_forward_slashes(Path::new("app/server.js")), "app/server.js");
/// ```
pub fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Normalize a project-relative path.
///
/// Resolves `.` and `..` segments and collapses repeated separators. Returns
/// `None` when the path is absolute or climbs above the project root.
///
/// # Examples
///
/// ```
/// use standalone::path_utils::normalize_relative;
///
/// assert_eq!(normalize_relative("./lib/../server.js").as_deref(), Some("server.js"));
/// assert_eq!(normalize_relative("../outside.js"), None);
/// assert_eq!(normalize_relative("/etc/passwd"), None);
/// ```
pub fn normalize_relative(path: &str) -> Option<String> {
    let path = path.replace('\\', "/");
    if path.starts_with('/') || has_drive_prefix(&path) {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Join a relative request onto a project-relative directory and normalize.
pub fn join_relative(dir: &str, request: &str) -> Option<String> {
    if dir.is_empty() {
        normalize_relative(request)
    } else {
        normalize_relative(&format!("{dir}/{request}"))
    }
}

/// Directory part of a project-relative path (`""` for top-level files)
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// True if `path` equals `prefix` or lies below it, comparing whole segments
pub fn is_within(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'/')
}

/// Strip `prefix/` from `path`, returning the remainder
pub fn strip_dir<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    if path == prefix {
        return Some("");
    }
    path.strip_prefix(prefix)?.strip_prefix('/')
}

/// True if the path names a compiled addon or shared library
pub fn is_native_asset(path: &str) -> bool {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    NATIVE_EXTENSIONS.contains(&ext.as_str())
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
