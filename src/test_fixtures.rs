//! Test fixtures for building module graphs without a manifest on disk.
//!
//! ```ignore
//! use crate::test_fixtures::GraphBuilder;
//!
//! let graph = GraphBuilder::new()
//!     .package("a", "1.0.0", "node_modules/a")
//!     .module("server.js", &["a"])
//!     .module("node_modules/a/index.js", &[])
//!     .build();
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::graph::{
    ModuleGraph, ModuleId, ModuleKind, ModuleNode, PackageDescriptor, PackageId, Reference,
};
use crate::path_utils;

/// Create a temp directory in the system temp location
pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Write `contents` to `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(&path, contents).expect("Failed to write file");
    path
}

/// Builder for in-memory module graphs
#[derive(Default)]
pub struct GraphBuilder {
    graph: ModuleGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_root(mut self, root: &Path) -> Self {
        self.graph.project_root = root.to_path_buf();
        self
    }

    pub fn package(mut self, name: &str, version: &str, root: &str) -> Self {
        self.graph.packages.insert(
            PackageId::new(root),
            PackageDescriptor {
                id: PackageId::new(root),
                name: name.to_string(),
                version: version.to_string(),
                main: Some("index.js".to_string()),
                exports: BTreeMap::new(),
                dependencies: Vec::new(),
                optional_dependencies: Vec::new(),
                native: false,
                files: None,
            },
        );
        self
    }

    /// Adjust a package added earlier
    pub fn configure(mut self, root: &str, f: impl FnOnce(&mut PackageDescriptor)) -> Self {
        let package = self
            .graph
            .packages
            .get_mut(&PackageId::new(root))
            .expect("package must be added before it is configured");
        f(package);
        self
    }

    pub fn depends(self, root: &str, dependencies: &[&str]) -> Self {
        self.configure(root, |p| {
            p.dependencies = dependencies.iter().map(|d| (*d).to_string()).collect();
        })
    }

    /// Add a module with static references
    pub fn module(mut self, id: &str, requests: &[&str]) -> Self {
        self.graph.modules.insert(
            ModuleId::new(id),
            ModuleNode {
                id: ModuleId::new(id),
                kind: ModuleKind::Application,
                package: None,
                references: requests.iter().map(|r| Reference::static_request(*r)).collect(),
                reexports: Vec::new(),
            },
        );
        self
    }

    /// Add a dynamic reference to a module added earlier
    pub fn dynamic(mut self, id: &str, hints: &[&str]) -> Self {
        let node = self
            .graph
            .modules
            .get_mut(&ModuleId::new(id))
            .expect("module must be added before its references");
        node.references
            .push(Reference::dynamic(hints.iter().map(|h| (*h).to_string()).collect()));
        self
    }

    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        self.graph
            .aliases
            .insert(alias.to_string(), ModuleId::new(target));
        self
    }

    /// Assign owning packages and kinds the way the manifest loader does
    pub fn build(mut self) -> ModuleGraph {
        let ids: Vec<ModuleId> = self.graph.modules.keys().cloned().collect();
        for id in ids {
            let package = self.graph.owning_package(id.as_str());
            let kind = if path_utils::is_native_asset(id.as_str()) {
                ModuleKind::Native
            } else if package.is_some() {
                ModuleKind::Package
            } else {
                ModuleKind::Application
            };
            if let Some(node) = self.graph.modules.get_mut(&id) {
                node.package = package;
                node.kind = kind;
            }
        }
        self.graph
    }
}
