//! Module resolution strategies
//!
//! The tracer never interprets a request itself. It asks a [`ModuleResolver`],
//! which maps `(importer, request)` to a module of the loaded graph. This keeps
//! the host runtime's resolution quirks in one place and lets the tracer be
//! tested against a deterministic fake.

mod node;

#[cfg(test)]
pub mod fake;

pub use node::{DEFAULT_EXTENSIONS, NodeResolver};

use crate::graph::{ModuleGraph, ModuleId, PackageId};

/// Outcome of resolving one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A module of the graph
    Module(ModuleId),
    /// Provided by the runtime itself; nothing to copy
    Builtin,
    /// Cannot be determined statically
    Unresolved,
}

/// Resolution strategy used by the tracer
pub trait ModuleResolver: Send + Sync {
    /// Resolve `request` as written in `importer`
    fn resolve(&self, graph: &ModuleGraph, importer: &ModuleId, request: &str) -> Resolution;

    /// Find the installed package `name` as seen from `from_dir`.
    ///
    /// `from_dir` is a project-relative directory (a module's directory or a
    /// package root), so nested installs shadow hoisted ones.
    fn resolve_package(&self, graph: &ModuleGraph, from_dir: &str, name: &str)
    -> Option<PackageId>;

    /// True if `request` names a whole package rather than a file inside one
    fn is_package_request(&self, request: &str) -> bool;
}
