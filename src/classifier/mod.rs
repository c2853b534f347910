//! File classifier
//!
//! Pure partitioning of a [`TraceResult`]: no I/O happens here. Full-package
//! file expansion is left to plan building.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::{ModuleGraph, ModuleId, ModuleKind, PackageId};
use crate::tracer::TraceResult;

/// Category of a bundled file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Application,
    Package,
    Native,
}

impl FileCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Application => "application",
            FileCategory::Package => "package",
            FileCategory::Native => "native",
        }
    }
}

impl From<ModuleKind> for FileCategory {
    fn from(kind: ModuleKind) -> Self {
        match kind {
            ModuleKind::Application => FileCategory::Application,
            ModuleKind::Package => FileCategory::Package,
            ModuleKind::Native => FileCategory::Native,
        }
    }
}

/// Why a package is copied in full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FullReason {
    /// Reached through a reference the tracer could not pin down
    Ambiguous,
    /// Ships compiled addons whose companion files are not traceable
    NativeAssets,
}

/// How a package's files are copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "reason", rename_all = "camelCase")]
pub enum CopyMode {
    /// Only reachable modules plus the package metadata
    Partial,
    /// The whole installation root
    Full(FullReason),
}

impl CopyMode {
    pub fn is_full(self) -> bool {
        matches!(self, CopyMode::Full(_))
    }
}

/// Per-file categories and per-package copy modes
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub files: BTreeMap<ModuleId, FileCategory>,
    pub packages: BTreeMap<PackageId, CopyMode>,
}

impl Classification {
    pub fn copy_mode(&self, package: &PackageId) -> Option<CopyMode> {
        self.packages.get(package).copied()
    }

    pub fn count(&self, category: FileCategory) -> usize {
        self.files.values().filter(|c| **c == category).count()
    }
}

/// Classify every reachable file and included package
pub fn classify(trace: &TraceResult, graph: &ModuleGraph) -> Classification {
    let mut classification = Classification::default();

    for id in &trace.modules {
        let category = graph
            .module(id)
            .map_or(FileCategory::Application, |node| node.kind.into());
        classification.files.insert(id.clone(), category);
    }

    for package in &trace.packages {
        let mode = if trace.is_ambiguous(package) {
            CopyMode::Full(FullReason::Ambiguous)
        } else if has_native_assets(trace, graph, package) {
            CopyMode::Full(FullReason::NativeAssets)
        } else {
            CopyMode::Partial
        };
        classification.packages.insert(package.clone(), mode);
    }

    classification
}

fn has_native_assets(trace: &TraceResult, graph: &ModuleGraph, package: &PackageId) -> bool {
    let declared = graph
        .package(package)
        .is_some_and(|descriptor| descriptor.declares_native_assets());

    declared
        || graph
            .modules_of(package)
            .any(|node| node.kind == ModuleKind::Native && trace.modules.contains(&node.id))
}
