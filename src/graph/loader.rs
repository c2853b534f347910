//! Module graph loader
//!
//! Turns one or more build manifest documents into a validated [`ModuleGraph`].
//! The module graph may legitimately contain cycles; the manifest's own
//! bookkeeping (ids, package roots, alias chains) may not.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ModuleGraph, ModuleId, ModuleKind, ModuleNode, PackageDescriptor, PackageId, Reference};
use crate::config::manifest::{
    BuildManifest, MANIFEST_VERSION, ModuleKindRecord, ModuleRecord, PackageRecord,
    ReferenceKind,
};
use crate::error::{BundlerError, Result, malformed};
use crate::launcher::is_valid_env_name;
use crate::path_utils;

/// Load the build manifest at `path`.
///
/// `path` is either a single JSON document or a directory whose `*.json` files
/// are merged in file-name order (one document per entry point).
pub fn load_manifest(path: &Path) -> Result<ModuleGraph> {
    let documents = read_documents(path)?;
    let base_dir = if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    };

    let manifest = merge_documents(documents)?;
    let graph = build_graph(manifest, &base_dir)?;

    debug!(
        modules = graph.modules.len(),
        packages = graph.packages.len(),
        root = %graph.project_root.display(),
        "loaded module graph"
    );
    Ok(graph)
}

fn read_documents(path: &Path) -> Result<Vec<(String, BuildManifest)>> {
    let read_failed = |reason: String| BundlerError::ManifestReadFailed {
        path: path.display().to_string(),
        reason,
    };

    if !path.is_dir() {
        let label = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
        return Ok(vec![(label.clone(), parse_document(path, &label)?)]);
    }

    let mut files: Vec<PathBuf> = fs::read_dir(path)
        .map_err(|e| read_failed(e.to_string()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(read_failed("no *.json manifest documents found".to_string()));
    }

    files
        .iter()
        .map(|file| {
            let label = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            parse_document(file, &label).map(|doc| (label, doc))
        })
        .collect()
}

fn parse_document(path: &Path, label: &str) -> Result<BuildManifest> {
    let content = fs::read_to_string(path).map_err(|e| BundlerError::ManifestReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    BuildManifest::from_json(&content).map_err(|e| malformed(label, e.to_string()))
}

/// Merge manifest documents into one.
///
/// A module listed by several documents (shared code) keeps the union of its
/// references; packages listed by several documents must agree on identity.
fn merge_documents(documents: Vec<(String, BuildManifest)>) -> Result<BuildManifest> {
    let multiple = documents.len() > 1;
    let field = |label: &str, name: String| {
        if multiple {
            format!("{label}: {name}")
        } else {
            name
        }
    };

    let mut merged = BuildManifest::default();
    let mut module_index: BTreeMap<String, usize> = BTreeMap::new();
    let mut package_index: BTreeMap<String, usize> = BTreeMap::new();

    for (label, doc) in documents {
        let version = doc
            .version
            .ok_or_else(|| malformed(field(&label, "version".into()), "missing required field"))?;
        if version != MANIFEST_VERSION {
            return Err(malformed(
                field(&label, "version".into()),
                format!("unsupported version {version}, expected {MANIFEST_VERSION}"),
            ));
        }
        merged.version = Some(version);

        let entries = doc
            .entries
            .ok_or_else(|| malformed(field(&label, "entries".into()), "missing required field"))?;
        let modules = doc
            .modules
            .ok_or_else(|| malformed(field(&label, "modules".into()), "missing required field"))?;

        if merged.project_root.is_none() {
            merged.project_root = doc.project_root;
        }
        if merged.runtime.is_none() {
            merged.runtime = doc.runtime;
        }
        for (key, value) in doc.env {
            merged.env.entry(key).or_insert(value);
        }
        for (alias, target) in doc.aliases {
            if let Some(existing) = merged.aliases.get(&alias) {
                if *existing != target {
                    return Err(malformed(
                        field(&label, format!("aliases.{alias}")),
                        format!("conflicting targets '{existing}' and '{target}'"),
                    ));
                }
            }
            merged.aliases.insert(alias, target);
        }

        merged.entries.get_or_insert_with(Vec::new).extend(entries);

        let mut seen_in_doc = BTreeSet::new();
        let merged_modules = merged.modules.get_or_insert_with(Vec::new);
        for (i, mut module) in modules.into_iter().enumerate() {
            let Some(id) = module.id.as_deref().map(normalized_key) else {
                return Err(malformed(
                    field(&label, format!("modules[{i}].id")),
                    "missing required field",
                ));
            };
            module.id = Some(id.clone());
            if !seen_in_doc.insert(id.clone()) {
                return Err(malformed(
                    field(&label, format!("modules[{i}].id")),
                    format!("module '{id}' is declared twice"),
                ));
            }
            match module_index.get(&id) {
                Some(&index) => merge_module(&mut merged_modules[index], module),
                None => {
                    module_index.insert(id, merged_modules.len());
                    merged_modules.push(module);
                }
            }
        }

        for (i, mut package) in doc.packages.into_iter().enumerate() {
            let Some(root) = package.root.as_deref().map(normalized_key) else {
                return Err(malformed(
                    field(&label, format!("packages[{i}].root")),
                    "missing required field",
                ));
            };
            package.root = Some(root.clone());
            match package_index.get(&root) {
                Some(&index) => {
                    let existing = &merged.packages[index];
                    if existing.name != package.name || existing.version != package.version {
                        return Err(malformed(
                            field(&label, format!("packages[{i}].root")),
                            format!("package root '{root}' is declared twice with different identities"),
                        ));
                    }
                }
                None => {
                    package_index.insert(root, merged.packages.len());
                    merged.packages.push(package);
                }
            }
        }
    }

    Ok(merged)
}

/// Merge key of a module id or package root; invalid paths are kept as written
/// and reported when the graph is built.
fn normalized_key(path: &str) -> String {
    let path = path.trim();
    path_utils::normalize_relative(path)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| path.to_string())
}

fn merge_module(into: &mut ModuleRecord, other: ModuleRecord) {
    for reference in other.references {
        if !into.references.contains(&reference) {
            into.references.push(reference);
        }
    }
    for request in other.reexports {
        if !into.reexports.contains(&request) {
            into.reexports.push(request);
        }
    }
    if into.kind.is_none() {
        into.kind = other.kind;
    }
}

fn build_graph(manifest: BuildManifest, base_dir: &Path) -> Result<ModuleGraph> {
    let root = base_dir.join(manifest.project_root.as_deref().unwrap_or("."));
    let project_root = fs::canonicalize(&root).unwrap_or(root);

    let mut graph = ModuleGraph {
        project_root,
        runtime: manifest.runtime,
        ..ModuleGraph::default()
    };

    for (i, record) in manifest.packages.into_iter().enumerate() {
        let package = build_package(i, record)?;
        if graph.packages.contains_key(&package.id) {
            return Err(malformed(
                format!("packages[{i}].root"),
                format!("package root '{}' is declared twice", package.id),
            ));
        }
        graph.packages.insert(package.id.clone(), package);
    }

    for (i, record) in manifest.modules.unwrap_or_default().into_iter().enumerate() {
        let node = build_module(i, record, &graph)?;
        if graph.modules.contains_key(&node.id) {
            return Err(malformed(
                format!("modules[{i}].id"),
                format!("module '{}' is declared twice", node.id),
            ));
        }
        graph.modules.insert(node.id.clone(), node);
    }

    graph.aliases = resolve_aliases(&manifest.aliases, &graph)?;

    for (i, entry) in manifest.entries.unwrap_or_default().into_iter().enumerate() {
        match entry.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => graph.entries.push(id),
            None => {
                return Err(malformed(
                    format!("entries[{i}].id"),
                    "missing required field",
                ));
            }
        }
    }

    for name in manifest.env.keys() {
        if !is_valid_env_name(name) {
            return Err(malformed(
                format!("env.{name}"),
                "invalid environment variable name",
            ));
        }
    }
    graph.env = manifest.env;

    Ok(graph)
}

fn required<'a>(value: Option<&'a String>, field: String) -> Result<&'a str> {
    match value.map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(malformed(field, "missing required field")),
    }
}

fn relative_path(value: &str, field: String) -> Result<String> {
    path_utils::normalize_relative(value)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            malformed(
                field,
                format!("'{value}' must be a relative path inside the project"),
            )
        })
}

fn build_package(i: usize, record: PackageRecord) -> Result<PackageDescriptor> {
    let name = required(record.name.as_ref(), format!("packages[{i}].name"))?.to_string();
    let version = required(record.version.as_ref(), format!("packages[{i}].version"))?.to_string();
    let root = required(record.root.as_ref(), format!("packages[{i}].root"))?;
    let root = relative_path(root, format!("packages[{i}].root"))?;

    let main = record
        .main
        .as_deref()
        .map(|main| relative_path(main, format!("packages[{i}].main")))
        .transpose()?;

    let mut exports = BTreeMap::new();
    for (subpath, target) in record.exports {
        let target = relative_path(&target, format!("packages[{i}].exports.{subpath}"))?;
        exports.insert(subpath, target);
    }

    let files = record
        .files
        .map(|files| {
            files
                .iter()
                .enumerate()
                .map(|(j, f)| relative_path(f, format!("packages[{i}].files[{j}]")))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?;

    Ok(PackageDescriptor {
        id: PackageId::new(root),
        name,
        version,
        main,
        exports,
        dependencies: record.dependencies,
        optional_dependencies: record.optional_dependencies,
        native: record.native,
        files,
    })
}

fn build_module(i: usize, record: ModuleRecord, graph: &ModuleGraph) -> Result<ModuleNode> {
    let id = required(record.id.as_ref(), format!("modules[{i}].id"))?;
    let id = relative_path(id, format!("modules[{i}].id"))?;
    let package = graph.owning_package(&id);

    let kind = match record.kind {
        Some(ModuleKindRecord::Application) => ModuleKind::Application,
        Some(ModuleKindRecord::Package) => ModuleKind::Package,
        Some(ModuleKindRecord::Native) => ModuleKind::Native,
        None if path_utils::is_native_asset(&id) => ModuleKind::Native,
        None if package.is_some() => ModuleKind::Package,
        None => ModuleKind::Application,
    };

    let mut references = Vec::with_capacity(record.references.len());
    for (j, reference) in record.references.into_iter().enumerate() {
        let request = reference.request.filter(|r| !r.trim().is_empty());
        if reference.kind == ReferenceKind::Static && request.is_none() {
            return Err(malformed(
                format!("modules[{i}].references[{j}].request"),
                "static reference without a request",
            ));
        }
        references.push(Reference {
            kind: reference.kind,
            request,
            hints: reference.hints,
        });
    }

    Ok(ModuleNode {
        id: ModuleId::new(id),
        kind,
        package,
        references,
        reexports: record.reexports,
    })
}

/// Follow alias chains to the module they name.
///
/// An alias may point at another alias; a chain that revisits an alias or ends
/// at something that is not a module is malformed.
fn resolve_aliases(
    aliases: &BTreeMap<String, String>,
    graph: &ModuleGraph,
) -> Result<BTreeMap<String, ModuleId>> {
    let mut resolved = BTreeMap::new();

    for alias in aliases.keys() {
        let mut chain = vec![alias.as_str()];
        let mut current = alias.as_str();

        let target = loop {
            let Some(next) = aliases.get(current) else {
                break None;
            };
            if let Some(path) = path_utils::normalize_relative(next) {
                if graph.module_at(&path).is_some() {
                    break Some(ModuleId::new(path));
                }
            }
            if chain.contains(&next.as_str()) {
                chain.push(next.as_str());
                return Err(malformed(
                    format!("aliases.{alias}"),
                    format!("alias cycle: {}", chain.join(" -> ")),
                ));
            }
            chain.push(next.as_str());
            current = next.as_str();
        };

        match target {
            Some(module) => {
                resolved.insert(alias.clone(), module);
            }
            None => {
                return Err(malformed(
                    format!("aliases.{alias}"),
                    format!("alias target '{current}' is not a module"),
                ));
            }
        }
    }

    Ok(resolved)
}
