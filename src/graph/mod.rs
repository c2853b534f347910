//! Module graph built from the build manifest
//!
//! Identifiers are project-relative, forward-slash paths:
//! - a [`ModuleId`] names a compiled file (`server.js`, `node_modules/a/index.js`)
//! - a [`PackageId`] names an installation root (`node_modules/a/node_modules/b`)
//!
//! Keying packages by installation root rather than by name keeps nested installs
//! of the same package apart. Everything here is immutable once loaded.

pub mod loader;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

pub use crate::config::manifest::ReferenceKind;
use crate::path_utils;

pub use loader::load_manifest;

macro_rules! path_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

path_id!(ModuleId);
path_id!(PackageId);

/// What a module is, which decides how its files are copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Application,
    Package,
    Native,
}

/// A reference made by a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Static request; absent for computed dynamic references
    pub request: Option<String>,
    /// Declared best-effort targets of a dynamic reference
    pub hints: Vec<String>,
}

impl Reference {
    pub fn static_request(request: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Static,
            request: Some(request.into()),
            hints: Vec::new(),
        }
    }

    pub fn dynamic(hints: Vec<String>) -> Self {
        Self {
            kind: ReferenceKind::Dynamic,
            request: None,
            hints,
        }
    }
}

/// A compiled module
#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub id: ModuleId,
    pub kind: ModuleKind,
    /// Owning package (longest installation root containing the module)
    pub package: Option<PackageId>,
    pub references: Vec<Reference>,
    /// Requests re-exported by this module, followed like static references
    pub reexports: Vec<String>,
}

impl ModuleNode {
    /// Directory the module's requests are resolved from
    pub fn dir(&self) -> &str {
        path_utils::parent_dir(self.id.as_str())
    }
}

/// An installed package version
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    pub id: PackageId,
    pub name: String,
    pub version: String,
    pub main: Option<String>,
    /// Subpath -> file, both normalized without a leading `./`
    pub exports: BTreeMap<String, String>,
    pub dependencies: Vec<String>,
    pub optional_dependencies: Vec<String>,
    pub native: bool,
    /// Complete file list relative to the root, if recorded by the build
    pub files: Option<Vec<String>>,
}

impl PackageDescriptor {
    /// Installation root relative to the project root
    pub fn root(&self) -> &str {
        self.id.as_str()
    }

    /// Files the package exposes to importers, relative to the root
    pub fn entry_files(&self) -> Vec<String> {
        let mut entries: Vec<String> = Vec::new();
        if let Some(main) = &self.main {
            entries.push(main.clone());
        }
        for target in self.exports.values() {
            if !target.contains('*') && !entries.contains(target) {
                entries.push(target.clone());
            }
        }
        entries
    }

    /// True if the package ships compiled addons according to its metadata
    pub fn declares_native_assets(&self) -> bool {
        self.native
            || self
                .files
                .as_ref()
                .is_some_and(|files| files.iter().any(|f| path_utils::is_native_asset(f)))
    }
}

/// The loaded module graph and package tree
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    /// Absolute project root all ids are relative to
    pub project_root: PathBuf,
    pub modules: BTreeMap<ModuleId, ModuleNode>,
    pub packages: BTreeMap<PackageId, PackageDescriptor>,
    /// Alias -> module, with chains already followed
    pub aliases: BTreeMap<String, ModuleId>,
    /// Entry points declared by the manifest, in order
    pub entries: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub runtime: Option<String>,
}

impl ModuleGraph {
    pub fn module(&self, id: &ModuleId) -> Option<&ModuleNode> {
        self.modules.get(id)
    }

    /// Look up a module by its project-relative path
    pub fn module_at(&self, path: &str) -> Option<&ModuleNode> {
        self.modules.get(&ModuleId::new(path))
    }

    pub fn package(&self, id: &PackageId) -> Option<&PackageDescriptor> {
        self.packages.get(id)
    }

    /// Look up a package by its installation root
    pub fn package_at(&self, root: &str) -> Option<&PackageDescriptor> {
        self.packages.get(&PackageId::new(root))
    }

    /// Resolve a root request: a module id or an alias
    pub fn lookup_root(&self, id: &str) -> Option<ModuleId> {
        let normalized = path_utils::normalize_relative(id)?;
        if self.modules.contains_key(&ModuleId::new(normalized.as_str())) {
            return Some(ModuleId::new(normalized));
        }
        self.aliases.get(id).cloned()
    }

    /// Package whose root is the longest prefix of `path`
    pub fn owning_package(&self, path: &str) -> Option<PackageId> {
        self.packages
            .keys()
            .filter(|root| path_utils::is_within(path, root.as_str()))
            .max_by_key(|root| root.as_str().len())
            .cloned()
    }

    /// Modules that belong to `package`
    pub fn modules_of<'a>(
        &'a self,
        package: &'a PackageId,
    ) -> impl Iterator<Item = &'a ModuleNode> + 'a {
        self.modules
            .values()
            .filter(move |node| node.package.as_ref() == Some(package))
    }
}
