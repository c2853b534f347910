//! Build manifest schema
//!
//! The manifest is written by the upstream build step. Every field is optional at
//! the serde level so that the loader can report exactly which field is missing
//! instead of a generic parse error.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Manifest format version understood by this crate
pub const MANIFEST_VERSION: u32 = 1;

/// One manifest document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    pub version: Option<u32>,

    /// Project root, relative to the manifest's directory
    #[serde(default)]
    pub project_root: Option<String>,

    /// Runtime command used by the launcher
    #[serde(default)]
    pub runtime: Option<String>,

    /// Environment defaults embedded in the launcher
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    pub entries: Option<Vec<EntryRecord>>,

    pub modules: Option<Vec<ModuleRecord>>,

    /// Package lock: installed package roots and their dependencies
    #[serde(default)]
    pub packages: Vec<PackageRecord>,

    /// Request aliases (alias -> module id or another alias)
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// A compiled entry point
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub id: Option<String>,
}

/// A compiled module and the references it makes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub id: Option<String>,

    #[serde(default)]
    pub kind: Option<ModuleKindRecord>,

    #[serde(default)]
    pub references: Vec<ReferenceRecord>,

    /// Requests re-exported by this module
    #[serde(default)]
    pub reexports: Vec<String>,
}

/// Declared module kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKindRecord {
    Application,
    Package,
    Native,
}

/// How a reference is made
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// A direct import; always followed
    #[default]
    Static,
    /// Resolved at runtime, e.g. plugin loading by computed name
    Dynamic,
}

/// A reference from one module to another
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRecord {
    #[serde(default)]
    pub request: Option<String>,

    #[serde(default)]
    pub kind: ReferenceKind,

    /// Best-effort targets for dynamic references
    #[serde(default)]
    pub hints: Vec<String>,
}

/// An installed package
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    pub name: Option<String>,
    pub version: Option<String>,

    /// Installation root relative to the project root
    pub root: Option<String>,

    #[serde(default)]
    pub main: Option<String>,

    /// Export map: subpath (".", "./feature", "./lib/*") -> file
    #[serde(default)]
    pub exports: BTreeMap<String, String>,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub optional_dependencies: Vec<String>,

    /// Declares compiled addons or other binaries
    #[serde(default)]
    pub native: bool,

    /// Complete file list relative to the package root, if the build recorded it
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

impl BuildManifest {
    /// Parse a manifest document from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
