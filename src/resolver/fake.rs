//! Table-driven resolver for tests

use std::collections::BTreeMap;

use super::{ModuleResolver, Resolution};
use crate::graph::{ModuleGraph, ModuleId, PackageId};

/// Resolver answering from fixed tables; anything unknown is unresolved
#[derive(Debug, Default)]
pub struct FakeResolver {
    /// request -> resolution, independent of the importer
    requests: BTreeMap<String, Resolution>,
    /// package name -> installation root, independent of the lookup directory
    packages: BTreeMap<String, PackageId>,
    /// (lookup directory, package name) -> installation root
    scoped_packages: BTreeMap<(String, String), PackageId>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, request: &str, target: &str) -> Self {
        self.requests
            .insert(request.to_string(), Resolution::Module(ModuleId::new(target)));
        self
    }

    pub fn builtin(mut self, request: &str) -> Self {
        self.requests.insert(request.to_string(), Resolution::Builtin);
        self
    }

    pub fn package(mut self, name: &str, root: &str) -> Self {
        self.packages.insert(name.to_string(), PackageId::new(root));
        self
    }

    pub fn package_from(mut self, from_dir: &str, name: &str, root: &str) -> Self {
        self.scoped_packages.insert(
            (from_dir.to_string(), name.to_string()),
            PackageId::new(root),
        );
        self
    }
}

impl ModuleResolver for FakeResolver {
    fn resolve(&self, _graph: &ModuleGraph, _importer: &ModuleId, request: &str) -> Resolution {
        self.requests
            .get(request)
            .cloned()
            .unwrap_or(Resolution::Unresolved)
    }

    fn resolve_package(
        &self,
        _graph: &ModuleGraph,
        from_dir: &str,
        name: &str,
    ) -> Option<PackageId> {
        self.scoped_packages
            .get(&(from_dir.to_string(), name.to_string()))
            .or_else(|| self.packages.get(name))
            .cloned()
    }

    fn is_package_request(&self, request: &str) -> bool {
        !request.starts_with('.') && !request.contains('/')
    }
}
