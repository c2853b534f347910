//! Launcher emitter
//!
//! Writes `server/<name>`, a POSIX shell script that locates the bundle from its
//! own path, applies environment defaults without overriding values already set
//! by the caller, and execs the runtime on the entry module.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, copy_failed};
use crate::temp::write_atomic;

/// Directory of the launcher inside the bundle
pub const SERVER_DIR: &str = "server";
/// Directory of application files inside the bundle
pub const APP_DIR: &str = "app";
/// Launcher file name when none is configured
pub const DEFAULT_LAUNCHER: &str = "start.sh";
/// Runtime command when neither config nor manifest names one
pub const DEFAULT_RUNTIME: &str = "node";

/// What the launcher starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherSpec {
    pub name: String,
    pub runtime: String,
    pub args: Vec<String>,
    /// Entry module, relative to `app/`
    pub entry: String,
    pub env: BTreeMap<String, String>,
}

impl LauncherSpec {
    /// Launcher path relative to the bundle root
    pub fn relative_path(&self) -> String {
        format!("{SERVER_DIR}/{}", self.name)
    }
}

/// True for portable environment variable names (`[A-Za-z_][A-Za-z0-9_]*`)
pub fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote `value` for a POSIX shell
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render the launcher script
pub fn render(spec: &LauncherSpec) -> String {
    let mut script = String::new();
    script.push_str("#!/bin/sh\n");
    script.push_str("# Generated by standalone. Do not edit.\n");
    script.push_str("set -e\n\n");
    script.push_str("BUNDLE_ROOT=$(CDPATH= cd -- \"$(dirname -- \"$0\")/..\" && pwd)\n");
    script.push_str("export BUNDLE_ROOT\n");

    if !spec.env.is_empty() {
        script.push('\n');
    }
    for (name, value) in &spec.env {
        let _ = writeln!(
            script,
            "[ -n \"${{{name}:-}}\" ] || {name}={}",
            shell_quote(value)
        );
        let _ = writeln!(script, "export {name}");
    }

    script.push('\n');
    let _ = writeln!(script, "cd \"$BUNDLE_ROOT/{APP_DIR}\"");

    let mut command = vec![shell_quote(&spec.runtime)];
    command.extend(spec.args.iter().map(|arg| shell_quote(arg)));
    command.push(format!("\"$BUNDLE_ROOT/{APP_DIR}/\"{}", shell_quote(&spec.entry)));
    command.push("\"$@\"".to_string());
    let _ = writeln!(script, "exec {}", command.join(" "));

    script
}

/// Write the launcher into `output` and return its path
pub fn emit_launcher(output: &Path, spec: &LauncherSpec) -> Result<PathBuf> {
    let path = output.join(SERVER_DIR).join(&spec.name);
    write_atomic(&path, render(spec).as_bytes(), executable())
        .map_err(|e| copy_failed(&path, e))?;
    debug!(launcher = %path.display(), entry = %spec.entry, "wrote launcher");
    Ok(path)
}

#[cfg(unix)]
fn executable() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn executable() -> Option<fs::Permissions> {
    None
}
