//! Node-style resolution against the loaded module graph
//!
//! Mirrors the host runtime's algorithm closely enough for tracing:
//! 1. aliases declared by the manifest
//! 2. core modules (`fs`, `node:fs`, ...) resolve to [`Resolution::Builtin`]
//! 3. relative and root-relative requests: exact file, extension probing,
//!    package directory entry, then `index.*`
//! 4. bare requests: `<dir>/node_modules/<name>` looked up from the importer's
//!    directory upward, then the package's `exports` map or `main`
//!
//! Only the graph is consulted, never the filesystem, so resolution is
//! deterministic for a given manifest.

use super::{ModuleResolver, Resolution};
use crate::graph::{ModuleGraph, ModuleId, PackageDescriptor, PackageId};
use crate::path_utils::{join_relative, normalize_relative, parent_dir};

/// Extensions probed after the exact path
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs", ".json", ".node"];

/// Core modules shipped with the runtime
const BUILTIN_MODULES: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Core subpaths; any other `<core>/...` request is looked up in packages
const BUILTIN_SUBPATHS: &[&str] = &[
    "assert/strict",
    "dns/promises",
    "fs/promises",
    "inspector/promises",
    "path/posix",
    "path/win32",
    "readline/promises",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "timers/promises",
    "util/types",
];

/// Resolver emulating the host runtime's module lookup
#[derive(Debug, Clone)]
pub struct NodeResolver {
    modules_dir: String,
    extensions: Vec<String>,
}

impl Default for NodeResolver {
    fn default() -> Self {
        Self::new("node_modules")
    }
}

impl NodeResolver {
    /// Create a resolver looking packages up in `modules_dir` directories
    pub fn new(modules_dir: impl Into<String>) -> Self {
        Self {
            modules_dir: modules_dir.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }

    /// Name of the package directory (`node_modules`)
    pub fn modules_dir(&self) -> &str {
        &self.modules_dir
    }

    /// Directories a bare `name` is looked up in, nearest first
    fn lookup_candidates(&self, from_dir: &str, name: &str) -> Vec<String> {
        let mut candidates = Vec::new();
        let mut current = from_dir;
        loop {
            let last_segment = current.rsplit('/').next().unwrap_or("");
            if last_segment != self.modules_dir {
                let candidate = if current.is_empty() {
                    format!("{}/{name}", self.modules_dir)
                } else {
                    format!("{current}/{}/{name}", self.modules_dir)
                };
                candidates.push(candidate);
            }
            if current.is_empty() {
                break;
            }
            current = parent_dir(current);
        }
        candidates
    }

    /// Exact file, then with each probed extension
    fn probe_file(&self, graph: &ModuleGraph, path: &str) -> Option<ModuleId> {
        if graph.module_at(path).is_some() {
            return Some(ModuleId::new(path));
        }
        self.extensions
            .iter()
            .map(|ext| format!("{path}{ext}"))
            .find(|candidate| graph.module_at(candidate).is_some())
            .map(ModuleId::new)
    }

    /// File, package directory, or directory index
    fn probe_path(&self, graph: &ModuleGraph, path: &str) -> Option<ModuleId> {
        if let Some(id) = self.probe_file(graph, path) {
            return Some(id);
        }
        if let Some(package) = graph.package_at(path) {
            if let Some(id) = self.package_main(graph, package) {
                return Some(id);
            }
        }
        self.probe_index(graph, path)
    }

    fn probe_index(&self, graph: &ModuleGraph, dir: &str) -> Option<ModuleId> {
        let index = if dir.is_empty() {
            "index".to_string()
        } else {
            format!("{dir}/index")
        };
        self.extensions
            .iter()
            .map(|ext| format!("{index}{ext}"))
            .find(|candidate| graph.module_at(candidate).is_some())
            .map(ModuleId::new)
    }

    fn package_main(&self, graph: &ModuleGraph, package: &PackageDescriptor) -> Option<ModuleId> {
        let root = package.root();
        if let Some(main) = &package.main {
            let path = join_relative(root, main)?;
            if let Some(id) = self.probe_file(graph, &path) {
                return Some(id);
            }
            if let Some(id) = self.probe_index(graph, &path) {
                return Some(id);
            }
        }
        self.probe_index(graph, root)
    }

    fn resolve_in_package(
        &self,
        graph: &ModuleGraph,
        package: &PackageDescriptor,
        subpath: &str,
    ) -> Option<ModuleId> {
        let root = package.root();

        if !package.exports.is_empty() {
            let key = if subpath.is_empty() {
                ".".to_string()
            } else {
                format!("./{subpath}")
            };
            let target = match_export(package, &key)?;
            let path = join_relative(root, &target)?;
            return self.probe_file(graph, &path);
        }

        if subpath.is_empty() {
            return self.package_main(graph, package);
        }
        self.probe_path(graph, &join_relative(root, subpath)?)
    }
}

impl ModuleResolver for NodeResolver {
    fn resolve(&self, graph: &ModuleGraph, importer: &ModuleId, request: &str) -> Resolution {
        if let Some(id) = graph.aliases.get(request) {
            return Resolution::Module(id.clone());
        }
        if is_builtin(request) {
            return Resolution::Builtin;
        }

        let importer_dir = parent_dir(importer.as_str());

        let resolved = if is_relative(request) {
            join_relative(importer_dir, request).and_then(|path| self.probe_path(graph, &path))
        } else if let Some(rooted) = request.strip_prefix('/') {
            normalize_relative(rooted).and_then(|path| self.probe_path(graph, &path))
        } else {
            split_bare_request(request).and_then(|(name, subpath)| {
                let package = self.resolve_package(graph, importer_dir, name)?;
                let descriptor = graph.package(&package)?;
                self.resolve_in_package(graph, descriptor, subpath)
            })
        };

        resolved.map_or(Resolution::Unresolved, Resolution::Module)
    }

    fn resolve_package(
        &self,
        graph: &ModuleGraph,
        from_dir: &str,
        name: &str,
    ) -> Option<PackageId> {
        self.lookup_candidates(from_dir, name)
            .into_iter()
            .find(|candidate| graph.package_at(candidate).is_some())
            .map(PackageId::new)
    }

    fn is_package_request(&self, request: &str) -> bool {
        !is_relative(request)
            && !request.starts_with('/')
            && !is_builtin(request)
            && split_bare_request(request).is_some_and(|(_, subpath)| subpath.is_empty())
    }
}

fn is_relative(request: &str) -> bool {
    request == "." || request == ".." || request.starts_with("./") || request.starts_with("../")
}

/// True for `node:*` requests, core module names and the listed core subpaths
pub fn is_builtin(request: &str) -> bool {
    if request.starts_with("node:") {
        return true;
    }
    BUILTIN_MODULES.contains(&request) || BUILTIN_SUBPATHS.contains(&request)
}

/// Split a bare request into package name and subpath.
///
/// `@scope/name/lib/x` -> (`@scope/name`, `lib/x`); `name` -> (`name`, ``)
fn split_bare_request(request: &str) -> Option<(&str, &str)> {
    if request.is_empty() {
        return None;
    }
    let name_end = if request.starts_with('@') {
        let first = request.find('/')?;
        request[first + 1..]
            .find('/')
            .map_or(request.len(), |second| first + 1 + second)
    } else {
        request.find('/').unwrap_or(request.len())
    };
    let (name, rest) = request.split_at(name_end);
    if name.is_empty() || name.ends_with('/') {
        return None;
    }
    Some((name, rest.trim_start_matches('/')))
}

/// Look `key` up in the export map, honouring one `*` wildcard per pattern
fn match_export(package: &PackageDescriptor, key: &str) -> Option<String> {
    if let Some(target) = package.exports.get(key) {
        return Some(target.clone());
    }
    package.exports.iter().find_map(|(pattern, target)| {
        let (prefix, suffix) = pattern.split_once('*')?;
        let middle = key.strip_prefix(prefix)?.strip_suffix(suffix)?;
        Some(target.replacen('*', middle, 1))
    })
}
