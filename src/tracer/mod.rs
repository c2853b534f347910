//! Dependency tracer
//!
//! Computes the reachability closure of the entry points over the module graph
//! and the installed package tree. The walk is breadth-first with a visited set,
//! so cyclic graphs terminate and every module is expanded once.
//!
//! Whenever precision is lost (a request nobody can resolve, a computed dynamic
//! import, an optional dependency) the tracer errs toward inclusion: the
//! package involved is marked to be copied in full and a [`Warning`] is
//! recorded.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{BundlerError, Result, Warning};
use crate::graph::{ModuleGraph, ModuleId, ModuleNode, PackageId, Reference, ReferenceKind};
use crate::path_utils;
use crate::resolver::{ModuleResolver, Resolution};

/// A reference whose target could not be determined statically
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiguousEdge {
    pub from: ModuleId,
    pub request: Option<String>,
    /// Package copied in full because of this edge
    pub package: Option<PackageId>,
}

/// Outcome of a trace
#[derive(Debug, Clone, Default)]
pub struct TraceResult {
    /// Resolved roots, in the order they were requested
    pub roots: Vec<ModuleId>,
    pub modules: BTreeSet<ModuleId>,
    pub packages: BTreeSet<PackageId>,
    /// Packages that must be copied in full, with the first reason found
    pub ambiguous_packages: BTreeMap<PackageId, String>,
    pub ambiguous_edges: Vec<AmbiguousEdge>,
    pub warnings: Vec<Warning>,
}

impl TraceResult {
    pub fn is_ambiguous(&self, package: &PackageId) -> bool {
        self.ambiguous_packages.contains_key(package)
    }
}

/// Reachability walk over a module graph
pub struct Tracer<'a, R: ModuleResolver + ?Sized> {
    graph: &'a ModuleGraph,
    resolver: &'a R,
}

impl<'a, R: ModuleResolver + ?Sized> Tracer<'a, R> {
    pub fn new(graph: &'a ModuleGraph, resolver: &'a R) -> Self {
        Self { graph, resolver }
    }

    /// Trace everything reachable from `roots`.
    ///
    /// Roots are module ids or aliases. Fails with `UnresolvedRoot` if one of
    /// them is not in the graph.
    pub fn trace(&self, roots: &[String]) -> Result<TraceResult> {
        let mut walk = Walk {
            graph: self.graph,
            resolver: self.resolver,
            result: TraceResult::default(),
            queue: VecDeque::new(),
        };

        for root in roots {
            let id = self
                .graph
                .lookup_root(root)
                .ok_or_else(|| BundlerError::UnresolvedRoot {
                    entry: root.clone(),
                })?;
            if !walk.result.roots.contains(&id) {
                walk.result.roots.push(id.clone());
            }
            walk.queue.push_back(id);
        }

        while let Some(id) = walk.queue.pop_front() {
            walk.visit(id);
        }

        let result = walk.result;
        debug!(
            modules = result.modules.len(),
            packages = result.packages.len(),
            ambiguous = result.ambiguous_packages.len(),
            "trace complete"
        );
        Ok(result)
    }
}

struct Walk<'a, R: ModuleResolver + ?Sized> {
    graph: &'a ModuleGraph,
    resolver: &'a R,
    result: TraceResult,
    queue: VecDeque<ModuleId>,
}

impl<R: ModuleResolver + ?Sized> Walk<'_, R> {
    fn visit(&mut self, id: ModuleId) {
        if self.result.modules.contains(&id) {
            return;
        }
        let graph = self.graph;
        let Some(node) = graph.module(&id) else {
            debug!(module = %id, "resolved to a module outside the graph, skipping");
            return;
        };
        self.result.modules.insert(id);

        if let Some(package) = &node.package {
            self.include_package(package.clone());
        }

        for request in &node.reexports {
            self.follow_static(node, request);
        }
        for reference in &node.references {
            match (reference.kind, reference.request.as_deref()) {
                (ReferenceKind::Static, Some(request)) => self.follow_static(node, request),
                _ => self.follow_dynamic(node, reference),
            }
        }
    }

    fn follow_static(&mut self, node: &ModuleNode, request: &str) {
        match self.resolver.resolve(self.graph, &node.id, request) {
            Resolution::Module(target) => self.queue.push_back(target),
            Resolution::Builtin => {}
            Resolution::Unresolved => self.ambiguous(node, Some(request.to_string())),
        }
    }

    fn follow_dynamic(&mut self, node: &ModuleNode, reference: &Reference) {
        if reference.hints.is_empty() {
            self.ambiguous(node, reference.request.clone());
            return;
        }

        for hint in &reference.hints {
            if self.resolver.is_package_request(hint) {
                if let Some(package) = self.resolver.resolve_package(self.graph, node.dir(), hint)
                {
                    self.include_package(package.clone());
                    self.mark_full(package, format!("loaded dynamically by {}", node.id));
                    continue;
                }
            }
            match self.resolver.resolve(self.graph, &node.id, hint) {
                Resolution::Module(target) => self.queue.push_back(target),
                Resolution::Builtin => {}
                Resolution::Unresolved => self.ambiguous(node, Some(hint.clone())),
            }
        }
    }

    fn ambiguous(&mut self, node: &ModuleNode, request: Option<String>) {
        let package = node.package.clone();
        if let Some(package) = &package {
            self.mark_full(
                package.clone(),
                format!("ambiguous reference from {}", node.id),
            );
        }

        let warning = Warning::UnresolvedAmbiguousEdge {
            from: node.id.clone(),
            request: request.clone(),
            package: package.clone(),
        };
        warn!("{warning}");
        self.result.warnings.push(warning);
        self.result.ambiguous_edges.push(AmbiguousEdge {
            from: node.id.clone(),
            request,
            package,
        });
    }

    fn mark_full(&mut self, package: PackageId, reason: String) {
        self.result
            .ambiguous_packages
            .entry(package)
            .or_insert(reason);
    }

    /// Include `package` and its dependency closure
    fn include_package(&mut self, package: PackageId) {
        let graph = self.graph;
        let mut pending = VecDeque::from([package]);

        while let Some(id) = pending.pop_front() {
            if !self.result.packages.insert(id.clone()) {
                continue;
            }
            let Some(descriptor) = graph.package(&id) else {
                continue;
            };
            debug!(package = %id, name = %descriptor.name, version = %descriptor.version, "including package");

            self.enqueue_entry_files(&id);

            for name in &descriptor.dependencies {
                match self.resolver.resolve_package(graph, descriptor.root(), name) {
                    Some(dependency) => pending.push_back(dependency),
                    None => self.missing_dependency(&id, name, false),
                }
            }
            for name in &descriptor.optional_dependencies {
                match self.resolver.resolve_package(graph, descriptor.root(), name) {
                    Some(dependency) => {
                        self.mark_full(dependency.clone(), format!("optional dependency of {id}"));
                        pending.push_back(dependency);
                    }
                    None => self.missing_dependency(&id, name, true),
                }
            }
        }
    }

    fn enqueue_entry_files(&mut self, package: &PackageId) {
        let graph = self.graph;
        let Some(descriptor) = graph.package(package) else {
            return;
        };
        let root = descriptor.root();
        // Requests are resolved as if made from a file at the package root.
        let importer = ModuleId::new(format!("{root}/package.json"));

        let mut requests: Vec<String> = descriptor
            .entry_files()
            .iter()
            .map(|entry| format!("./{entry}"))
            .collect();
        if requests.is_empty() {
            requests.push(".".to_string());
        }

        for request in requests {
            if let Some(path) = path_utils::join_relative(root, &request) {
                if self.graph.module_at(&path).is_some() {
                    self.queue.push_back(ModuleId::new(path));
                    continue;
                }
            }
            match self.resolver.resolve(self.graph, &importer, &request) {
                Resolution::Module(target) => self.queue.push_back(target),
                Resolution::Builtin | Resolution::Unresolved => {
                    debug!(package = %package, request = %request, "entry file not in module graph");
                }
            }
        }
    }

    fn missing_dependency(&mut self, package: &PackageId, dependency: &str, optional: bool) {
        let warning = Warning::MissingDependency {
            package: package.clone(),
            dependency: dependency.to_string(),
            optional,
        };
        warn!("{warning}");
        self.result.warnings.push(warning);
    }
}
