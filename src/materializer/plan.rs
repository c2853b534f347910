//! Bundle plan
//!
//! Maps every file the bundle needs to its destination below the output
//! directory. Building the plan is the last step that looks at the project;
//! everything after it only follows the plan.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;
use wax::{CandidatePath, Glob, Pattern};

use crate::classifier::{Classification, CopyMode, FileCategory};
use crate::error::{BundlerError, Result};
use crate::graph::{ModuleGraph, ModuleId, PackageDescriptor, PackageId};
use crate::launcher::{APP_DIR, LauncherSpec};
use crate::path_utils::{self, is_native_asset, normalize_relative, strip_dir};

/// Directory packages are installed into, in the project and in the bundle
pub const MODULES_DIR: &str = "node_modules";

/// One file to copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyInstruction {
    /// Absolute source path
    pub source: PathBuf,
    /// Source path relative to the project root
    pub source_rel: String,
    /// Destination relative to the output directory
    pub destination: String,
    pub category: FileCategory,
    pub package: Option<PackageId>,
}

/// Inputs of plan building besides the graph and the classification
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Root module the launcher starts
    pub entry: ModuleId,
    pub launcher_name: String,
    pub runtime: String,
    pub runtime_args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Globs of extra project files
    pub include: Vec<String>,
    /// Globs of planned files to drop
    pub exclude: Vec<String>,
    /// Output directory, never picked up by `include` globs
    pub output: Option<PathBuf>,
}

/// Ordered copy instructions plus launcher metadata
#[derive(Debug, Clone)]
pub struct BundlePlan {
    /// Sorted by destination; destinations are unique
    pub instructions: Vec<CopyInstruction>,
    pub launcher: LauncherSpec,
    /// Copy mode of every included package, for reporting
    pub packages: BTreeMap<PackageId, CopyMode>,
}

impl BundlePlan {
    /// Build the plan for a classified trace
    pub fn build(
        graph: &ModuleGraph,
        classification: &Classification,
        options: &PlanOptions,
    ) -> Result<Self> {
        let include = compile_globs(&options.include)?;
        let exclude = compile_globs(&options.exclude)?;

        let mut builder = PlanBuilder {
            graph,
            entries: BTreeMap::new(),
        };

        // Reachable modules of application code and partial packages.
        for (id, category) in &classification.files {
            let package = graph.module(id).and_then(|node| node.package.clone());
            let partial_or_none = package
                .as_ref()
                .is_none_or(|p| !classification.copy_mode(p).is_some_and(CopyMode::is_full));
            if partial_or_none {
                builder.add(id.as_str(), *category, package)?;
            }
        }

        for (package, mode) in &classification.packages {
            let Some(descriptor) = graph.package(package) else {
                continue;
            };
            match mode {
                CopyMode::Full(_) => builder.add_full_package(descriptor)?,
                CopyMode::Partial => {
                    let manifest = format!("{}/package.json", descriptor.root());
                    if graph.project_root.join(&manifest).is_file() {
                        builder.add(&manifest, FileCategory::Package, Some(package.clone()))?;
                    }
                }
            }
        }

        if !include.is_empty() {
            builder.add_included(&include, options.output.as_deref())?;
        }

        let entry_destination = builder.destination(options.entry.as_str());
        if !exclude.is_empty() {
            builder.entries.retain(|destination, instruction| {
                let keep = *destination == entry_destination
                    || !matches_any(&exclude, &instruction.source_rel);
                if !keep {
                    debug!(file = %instruction.source_rel, "excluded by pattern");
                }
                keep
            });
        }

        let entry = strip_dir(&entry_destination, APP_DIR)
            .unwrap_or(&entry_destination)
            .to_string();

        let plan = Self {
            instructions: builder.entries.into_values().collect(),
            launcher: LauncherSpec {
                name: options.launcher_name.clone(),
                runtime: options.runtime.clone(),
                args: options.runtime_args.clone(),
                entry,
                env: options.env.clone(),
            },
            packages: classification.packages.clone(),
        };
        debug!(files = plan.instructions.len(), "built bundle plan");
        Ok(plan)
    }

    /// Destinations of all instructions
    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.instructions.iter().map(|i| i.destination.as_str())
    }
}

struct PlanBuilder<'a> {
    graph: &'a ModuleGraph,
    entries: BTreeMap<String, CopyInstruction>,
}

impl PlanBuilder<'_> {
    /// Destination of a project-relative source path
    fn destination(&self, source_rel: &str) -> String {
        match self.graph.owning_package(source_rel).and_then(|id| self.graph.package(&id)) {
            Some(package) => {
                let inner = strip_dir(source_rel, package.root()).unwrap_or(source_rel);
                let base = package_destination(package);
                if inner.is_empty() {
                    base
                } else {
                    format!("{base}/{inner}")
                }
            }
            None => format!("{APP_DIR}/{source_rel}"),
        }
    }

    fn add(
        &mut self,
        source_rel: &str,
        category: FileCategory,
        package: Option<PackageId>,
    ) -> Result<()> {
        let destination = self.destination(source_rel);
        let instruction = CopyInstruction {
            source: self.graph.project_root.join(source_rel),
            source_rel: source_rel.to_string(),
            destination: destination.clone(),
            category,
            package,
        };

        match self.entries.get(&destination) {
            Some(existing) if existing.source_rel == instruction.source_rel => Ok(()),
            Some(existing) => Err(BundlerError::PlanConflict {
                destination,
                first: existing.source_rel.clone(),
                second: instruction.source_rel,
            }),
            None => {
                self.entries.insert(destination, instruction);
                Ok(())
            }
        }
    }

    fn add_full_package(&mut self, package: &PackageDescriptor) -> Result<()> {
        let root = package.root();
        let files: Vec<String> = match &package.files {
            Some(files) => files
                .iter()
                .filter_map(|file| {
                    let normalized = normalize_relative(file);
                    if normalized.is_none() {
                        warn!(package = %package.id, file = %file, "ignoring file outside package root");
                    }
                    normalized
                })
                .collect(),
            None => walk_package(&self.graph.project_root.join(root))?,
        };

        for file in files {
            let source_rel = format!("{root}/{file}");
            if !self.graph.project_root.join(&source_rel).is_file() {
                warn!(package = %package.id, file = %file, "listed file is missing, skipping");
                continue;
            }
            let category = if is_native_asset(&file) {
                FileCategory::Native
            } else {
                FileCategory::Package
            };
            self.add(&source_rel, category, Some(package.id.clone()))?;
        }
        Ok(())
    }

    fn add_included(&mut self, include: &[Glob<'_>], output: Option<&Path>) -> Result<()> {
        let project_root = self.graph.project_root.clone();
        let walker = WalkDir::new(&project_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let is_output = output.is_some_and(|out| entry.path() == out);
                !(is_output || (entry.file_type().is_dir() && entry.file_name() == MODULES_DIR))
            });

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&project_root) else {
                continue;
            };
            let relative = path_utils::to_forward_slashes(relative);
            if matches_any(include, &relative) {
                let package = self.graph.owning_package(&relative);
                let category = match &package {
                    Some(_) => FileCategory::Package,
                    None => FileCategory::Application,
                };
                self.add(&relative, category, package)?;
            }
        }
        Ok(())
    }
}

/// Bundle directory of a package.
///
/// Installs below a `node_modules` directory keep their whole project-relative
/// path under `app/`, so every copy sits where the runtime's upward lookup from
/// the importing file expects it. Packages installed elsewhere (workspace links)
/// land at `app/node_modules/<name>`.
pub fn package_destination(package: &PackageDescriptor) -> String {
    let root = package.root();
    if root.split('/').any(|segment| segment == MODULES_DIR) {
        format!("{APP_DIR}/{root}")
    } else {
        format!("{APP_DIR}/{MODULES_DIR}/{}", package.name)
    }
}

/// Files of a package directory, skipping nested packages
fn walk_package(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == MODULES_DIR));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            files.push(path_utils::to_forward_slashes(relative));
        }
    }
    Ok(files)
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Glob<'_>>> {
    patterns
        .iter()
        .map(|pattern| {
            Glob::new(pattern).map_err(|e| BundlerError::InvalidGlob {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn matches_any(globs: &[Glob<'_>], path: &str) -> bool {
    let candidate = CandidatePath::from(path);
    globs.iter().any(|glob| glob.matched(&candidate).is_some())
}
