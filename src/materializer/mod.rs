//! Bundle materializer
//!
//! Turns a [`BundlePlan`] into files on disk:
//! 1. flag the output incomplete
//! 2. copy every planned file in parallel
//! 3. prune files the plan no longer contains
//! 4. write the audit manifest
//!
//! Output ownership is taken by the caller with [`OutputGuard`] before any of
//! this runs.

pub mod copy;
pub mod guard;
pub mod plan;
pub mod prune;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::cancel::CancellationToken;
use crate::classifier::{CopyMode, FullReason};
use crate::config::audit::{AUDIT_VERSION, AuditEdge, AuditFile, AuditManifest, AuditPackage};
use crate::config::AUDIT_FILE;
use crate::error::{Result, copy_failed};
use crate::graph::ModuleGraph;
use crate::progress::ProgressDisplay;
use crate::temp::write_atomic;
use crate::tracer::TraceResult;

pub use copy::{CopyOptions, CopyStats, default_concurrency};
pub use guard::{LOCK_FILE, OutputGuard, SENTINEL_FILE, clear_incomplete, is_incomplete, mark_incomplete};
pub use plan::{BundlePlan, CopyInstruction, PlanOptions};

/// What a materialization did
#[derive(Debug, Clone)]
pub struct MaterializeReport {
    pub stats: CopyStats,
    pub pruned: usize,
    pub audit: PathBuf,
}

/// Writes a bundle plan into an output directory
pub struct Materializer<'a> {
    output: &'a Path,
    options: CopyOptions,
    cancel: &'a CancellationToken,
    quiet: bool,
}

impl<'a> Materializer<'a> {
    pub fn new(output: &'a Path, options: CopyOptions, cancel: &'a CancellationToken) -> Self {
        Self {
            output,
            options,
            cancel,
            quiet: false,
        }
    }

    /// Hide the progress bar
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Copy, prune and record `plan`
    pub fn execute(
        &self,
        plan: &BundlePlan,
        graph: &ModuleGraph,
        trace: &TraceResult,
    ) -> Result<MaterializeReport> {
        mark_incomplete(self.output)?;
        self.cancel.check()?;

        let progress = ProgressDisplay::new(plan.instructions.len() as u64, self.quiet);
        let copied = copy::copy_all(
            &plan.instructions,
            self.output,
            self.options,
            self.cancel,
            &progress,
        );
        let (outcomes, stats) = match copied {
            Ok(result) => {
                progress.finish();
                result
            }
            Err(e) => {
                progress.abandon();
                return Err(e);
            }
        };
        self.cancel.check()?;

        let mut keep: BTreeSet<String> = plan.destinations().map(str::to_string).collect();
        keep.extend(
            [LOCK_FILE, SENTINEL_FILE, AUDIT_FILE]
                .into_iter()
                .map(str::to_string),
        );
        keep.insert(plan.launcher.relative_path());
        let pruned = prune::prune(self.output, &keep)?;

        let audit = build_audit(plan, &outcomes, graph, trace);
        let audit_path = self.output.join(AUDIT_FILE);
        write_atomic(&audit_path, audit.to_json()?.as_bytes(), None)
            .map_err(|e| copy_failed(&audit_path, e))?;

        info!(
            copied = stats.copied,
            skipped = stats.skipped,
            pruned,
            "materialized bundle"
        );
        Ok(MaterializeReport {
            stats,
            pruned,
            audit: audit_path,
        })
    }
}

fn build_audit(
    plan: &BundlePlan,
    outcomes: &[copy::CopyOutcome],
    graph: &ModuleGraph,
    trace: &TraceResult,
) -> AuditManifest {
    let files = plan
        .instructions
        .iter()
        .zip(outcomes)
        .map(|(instruction, outcome)| AuditFile {
            destination: instruction.destination.clone(),
            source: instruction.source_rel.clone(),
            category: instruction.category.as_str().to_string(),
            package: instruction.package.as_ref().map(ToString::to_string),
            hash: outcome.hash.clone(),
        })
        .collect();

    let packages = plan
        .packages
        .iter()
        .filter_map(|(id, mode)| {
            let descriptor = graph.package(id)?;
            let (mode, reason) = match mode {
                CopyMode::Partial => ("partial", None),
                CopyMode::Full(FullReason::Ambiguous) => (
                    "full",
                    Some(
                        trace
                            .ambiguous_packages
                            .get(id)
                            .cloned()
                            .unwrap_or_else(|| "ambiguous".to_string()),
                    ),
                ),
                CopyMode::Full(FullReason::NativeAssets) => {
                    ("full", Some("ships native assets".to_string()))
                }
            };
            Some(AuditPackage {
                root: id.to_string(),
                name: descriptor.name.clone(),
                version: descriptor.version.clone(),
                mode: mode.to_string(),
                reason,
            })
        })
        .collect();

    AuditManifest {
        version: AUDIT_VERSION,
        entry: trace
            .roots
            .first()
            .map(ToString::to_string)
            .unwrap_or_default(),
        launcher: plan.launcher.relative_path(),
        runtime: plan.launcher.runtime.clone(),
        files,
        packages,
        ambiguous_edges: trace
            .ambiguous_edges
            .iter()
            .map(|edge| AuditEdge {
                from: edge.from.to_string(),
                request: edge.request.clone(),
                package: edge.package.as_ref().map(ToString::to_string),
            })
            .collect(),
        warnings: trace.warnings.iter().map(ToString::to_string).collect(),
    }
}
