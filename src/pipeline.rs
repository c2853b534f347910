//! Bundle pipeline
//!
//! Runs the stages strictly in order:
//!
//! ```text
//! Loaded -> Traced -> Classified -> Materialized -> Launched
//! ```
//!
//! Any failure moves the run to `Failed` and aborts the remaining stages. The
//! output directory is locked before anything is written and flagged incomplete
//! until the launcher exists, so a failed or interrupted run never leaves a tree
//! that looks valid.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::cancel::CancellationToken;
use crate::classifier::{self, Classification};
use crate::config::LauncherConfig;
use crate::error::{BundlerError, Result, Warning, malformed};
use crate::graph::{self, ModuleGraph, ModuleId, PackageId};
use crate::launcher::{self, DEFAULT_LAUNCHER, DEFAULT_RUNTIME};
use crate::materializer::{
    BundlePlan, CopyOptions, CopyStats, Materializer, OutputGuard, PlanOptions, clear_incomplete,
    default_concurrency, mark_incomplete,
};
use crate::resolver::ModuleResolver;
use crate::tracer::{TraceResult, Tracer};

/// Stage a run has reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Loaded,
    Traced,
    Classified,
    Materialized,
    Launched,
    Failed(String),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Pending => f.write_str("pending"),
            RunState::Loaded => f.write_str("loaded"),
            RunState::Traced => f.write_str("traced"),
            RunState::Classified => f.write_str("classified"),
            RunState::Materialized => f.write_str("materialized"),
            RunState::Launched => f.write_str("launched"),
            RunState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Everything a bundle run needs, after merging CLI flags and configuration
#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub manifest: PathBuf,
    pub output: PathBuf,
    /// Entry points; the manifest's entries are used when empty
    pub entries: Vec<String>,
    pub concurrency: usize,
    pub retries: u32,
    /// Environment defaults overriding the manifest's
    pub env: BTreeMap<String, String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub launcher: LauncherConfig,
    pub dry_run: bool,
    pub quiet: bool,
}

impl BundleOptions {
    pub fn new(manifest: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            output: output.into(),
            entries: Vec::new(),
            concurrency: default_concurrency(),
            retries: 3,
            env: BTreeMap::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            launcher: LauncherConfig::default(),
            dry_run: false,
            quiet: false,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: PathBuf,
    pub entry: String,
    pub modules: usize,
    pub packages: usize,
    pub full_packages: usize,
    /// Planned files as (source, destination)
    pub files: Vec<(String, String)>,
    pub copy: CopyStats,
    pub pruned: usize,
    pub launcher: Option<PathBuf>,
    pub warnings: Vec<Warning>,
    pub dry_run: bool,
}

/// One bundle run
pub struct Pipeline<'a, R: ModuleResolver + ?Sized> {
    options: &'a BundleOptions,
    resolver: &'a R,
    cancel: CancellationToken,
    state: RunState,
}

impl<'a, R: ModuleResolver + ?Sized> Pipeline<'a, R> {
    pub fn new(options: &'a BundleOptions, resolver: &'a R, cancel: CancellationToken) -> Self {
        Self {
            options,
            resolver,
            cancel,
            state: RunState::Pending,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run all stages
    pub fn run(&mut self) -> Result<RunSummary> {
        let result = if self.options.dry_run {
            self.run_dry()
        } else {
            self.run_owned()
        };
        if let Err(e) = &result {
            error!(stage = %self.state, error = %e, "bundle run failed");
            self.state = RunState::Failed(e.to_string());
        }
        result
    }

    fn advance(&mut self, state: RunState) -> Result<()> {
        debug!(stage = %state, "stage complete");
        self.state = state;
        self.cancel.check()
    }

    fn run_owned(&mut self) -> Result<RunSummary> {
        let loaded = self.load();
        // Checked before locking too, so nothing is written into the project.
        if let (Ok(graph), Ok(existing)) = (&loaded, fs::canonicalize(&self.options.output)) {
            ensure_output_outside_project(&existing, graph)?;
        }

        let _guard = OutputGuard::acquire(&self.options.output)?;
        let output = fs::canonicalize(&self.options.output)?;
        let graph = match loaded {
            Ok(graph) => graph,
            Err(err) => {
                mark_incomplete(&output)?;
                return Err(err);
            }
        };
        ensure_output_outside_project(&output, &graph)?;
        mark_incomplete(&output)?;
        self.cancel.check()?;

        let (trace, classification, plan) = self.prepare(&graph, Some(&output))?;
        ensure_sources_outside_output(&output, &plan)?;

        let report = Materializer::new(&output, self.copy_options(), &self.cancel)
            .quiet(self.options.quiet)
            .execute(&plan, &graph, &trace)?;
        self.advance(RunState::Materialized)?;

        let launcher = launcher::emit_launcher(&output, &plan.launcher)?;
        clear_incomplete(&output)?;
        self.state = RunState::Launched;
        info!(output = %output.display(), launcher = %launcher.display(), "bundle complete");

        Ok(summary(
            output,
            &trace,
            &classification,
            &plan,
            report.stats,
            report.pruned,
            Some(launcher),
            false,
        ))
    }

    fn run_dry(&mut self) -> Result<RunSummary> {
        let graph = self.load()?;
        let output = match fs::canonicalize(&self.options.output) {
            Ok(existing) => {
                ensure_output_outside_project(&existing, &graph)?;
                existing
            }
            Err(_) => self.options.output.clone(),
        };
        let (trace, classification, plan) = self.prepare(&graph, Some(&output))?;
        ensure_sources_outside_output(&output, &plan)?;
        info!(files = plan.instructions.len(), "dry run, nothing written");

        Ok(summary(
            output,
            &trace,
            &classification,
            &plan,
            CopyStats::default(),
            0,
            None,
            true,
        ))
    }

    /// Load the manifest. Cancellation is checked once the output is flagged.
    fn load(&mut self) -> Result<ModuleGraph> {
        let graph = graph::load_manifest(&self.options.manifest)?;
        debug!(stage = %RunState::Loaded, "stage complete");
        self.state = RunState::Loaded;
        Ok(graph)
    }

    /// Trace, classify and plan
    fn prepare(
        &mut self,
        graph: &ModuleGraph,
        output: Option<&Path>,
    ) -> Result<(TraceResult, Classification, BundlePlan)> {
        let roots = if self.options.entries.is_empty() {
            graph.entries.clone()
        } else {
            self.options.entries.clone()
        };
        if roots.is_empty() {
            return Err(malformed("entries", "no entry points declared"));
        }
        let trace = Tracer::new(graph, self.resolver).trace(&roots)?;
        self.advance(RunState::Traced)?;

        let classification = classifier::classify(&trace, graph);
        self.advance(RunState::Classified)?;

        let options = self.plan_options(graph, &trace, output);
        let plan = BundlePlan::build(graph, &classification, &options)?;
        self.cancel.check()?;

        Ok((trace, classification, plan))
    }

    fn plan_options(
        &self,
        graph: &ModuleGraph,
        trace: &TraceResult,
        output: Option<&Path>,
    ) -> PlanOptions {
        let launcher = &self.options.launcher;
        let mut env = graph.env.clone();
        env.extend(self.options.env.clone());

        PlanOptions {
            entry: trace.roots.first().cloned().unwrap_or_default(),
            launcher_name: launcher
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_LAUNCHER.to_string()),
            runtime: launcher
                .runtime
                .clone()
                .or_else(|| graph.runtime.clone())
                .unwrap_or_else(|| DEFAULT_RUNTIME.to_string()),
            runtime_args: launcher.args.clone(),
            env,
            include: self.options.include.clone(),
            exclude: self.options.exclude.clone(),
            output: output.map(Path::to_path_buf),
        }
    }

    fn copy_options(&self) -> CopyOptions {
        CopyOptions {
            concurrency: self.options.concurrency.max(1),
            retries: self.options.retries,
        }
    }
}

/// Refuse an output that is, or encloses, the project or any of its sources.
///
/// Pruning deletes everything in the output that is not planned, so such an
/// output would lose project files.
fn ensure_output_outside_project(output: &Path, graph: &ModuleGraph) -> Result<()> {
    if graph.project_root.starts_with(output) {
        return Err(overlaps(
            output,
            format!("contains the project root {}", graph.project_root.display()),
        ));
    }
    let enclosed = graph
        .modules
        .keys()
        .map(ModuleId::as_str)
        .chain(graph.packages.keys().map(PackageId::as_str))
        .find(|path| graph.project_root.join(path).starts_with(output));
    match enclosed {
        Some(path) => Err(overlaps(output, format!("contains project source {path}"))),
        None => Ok(()),
    }
}

fn ensure_sources_outside_output(output: &Path, plan: &BundlePlan) -> Result<()> {
    match plan.instructions.iter().find(|i| i.source.starts_with(output)) {
        Some(instruction) => Err(overlaps(
            output,
            format!("contains planned source {}", instruction.source_rel),
        )),
        None => Ok(()),
    }
}

fn overlaps(output: &Path, reason: String) -> BundlerError {
    BundlerError::OutputOverlapsSources {
        output: output.display().to_string(),
        reason,
    }
}

#[allow(clippy::too_many_arguments)]
fn summary(
    output: PathBuf,
    trace: &TraceResult,
    classification: &Classification,
    plan: &BundlePlan,
    copy: CopyStats,
    pruned: usize,
    launcher: Option<PathBuf>,
    dry_run: bool,
) -> RunSummary {
    RunSummary {
        output,
        entry: trace.roots.first().map(ToString::to_string).unwrap_or_default(),
        modules: trace.modules.len(),
        packages: classification.packages.len(),
        full_packages: classification
            .packages
            .values()
            .filter(|mode| mode.is_full())
            .count(),
        files: plan
            .instructions
            .iter()
            .map(|i| (i.source_rel.clone(), i.destination.clone()))
            .collect(),
        copy,
        pruned,
        launcher,
        warnings: trace.warnings.clone(),
        dry_run,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_IO;
    use crate::materializer::{OutputGuard, is_incomplete};
    use crate::resolver::NodeResolver;
    use crate::test_fixtures::{create_temp_dir, write_file};

    const MANIFEST: &str = r#"{
        "version": 1,
        "env": { "NODE_ENV": "production" },
        "entries": [{ "id": "server.js" }],
        "modules": [
            { "id": "server.js", "references": [{ "request": "a" }] },
            { "id": "node_modules/a/index.js" }
        ],
        "packages": [
            { "name": "a", "version": "1.0.0", "root": "node_modules/a", "main": "index.js" }
        ]
    }"#;

    fn project() -> tempfile::TempDir {
        let temp = create_temp_dir();
        write_file(temp.path(), "manifest.json", MANIFEST);
        write_file(temp.path(), "server.js", "require('a')");
        write_file(temp.path(), "node_modules/a/index.js", "");
        temp
    }

    fn options(project: &Path) -> BundleOptions {
        let mut options = BundleOptions::new(project.join("manifest.json"), project.join("out"));
        options.quiet = true;
        options.concurrency = 2;
        options
    }

    #[test]
    fn test_run_reaches_launched_and_clears_sentinel() {
        let project = project();
        let options = options(project.path());
        let resolver = NodeResolver::default();
        let mut pipeline = Pipeline::new(&options, &resolver, CancellationToken::new());

        let summary = pipeline.run().unwrap();

        assert_eq!(pipeline.state(), &RunState::Launched);
        assert_eq!(summary.entry, "server.js");
        assert_eq!(summary.copy.copied, 2);
        let out = project.path().join("out");
        assert!(!is_incomplete(&out));
        assert!(out.join("server/start.sh").is_file());
        assert!(out.join(crate::materializer::LOCK_FILE).exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let project = project();
        let mut options = options(project.path());
        options.dry_run = true;
        let resolver = NodeResolver::default();

        let summary = Pipeline::new(&options, &resolver, CancellationToken::new())
            .run()
            .unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.files.len(), 2);
        assert!(!project.path().join("out").exists());
    }

    #[test]
    fn test_unknown_entry_fails_and_keeps_sentinel() {
        let project = project();
        let mut options = options(project.path());
        options.entries = vec!["missing.js".to_string()];
        let resolver = NodeResolver::default();
        let mut pipeline = Pipeline::new(&options, &resolver, CancellationToken::new());

        let err = pipeline.run().unwrap_err();

        assert!(matches!(err, BundlerError::UnresolvedRoot { .. }));
        assert!(matches!(pipeline.state(), RunState::Failed(_)));
        assert!(is_incomplete(&project.path().join("out")));
    }

    #[test]
    fn test_held_lock_leaves_output_untouched() {
        let project = project();
        let options = options(project.path());
        let out = project.path().join("out");
        let _held = OutputGuard::acquire(&out).unwrap();
        let resolver = NodeResolver::default();

        let err = Pipeline::new(&options, &resolver, CancellationToken::new())
            .run()
            .unwrap_err();

        assert!(matches!(err, BundlerError::ConcurrentRunConflict { .. }));
        assert!(!is_incomplete(&out));
        assert!(!out.join("app").exists());
    }

    #[test]
    fn test_cancelled_run_stops_before_copying() {
        let project = project();
        let options = options(project.path());
        let resolver = NodeResolver::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = Pipeline::new(&options, &resolver, cancel).run().unwrap_err();

        assert!(matches!(err, BundlerError::Cancelled));
        let out = project.path().join("out");
        assert!(is_incomplete(&out));
        assert!(!out.join("app").exists());
    }

    #[test]
    fn test_config_env_overrides_manifest_env() {
        let project = project();
        let mut options = options(project.path());
        options.env.insert("NODE_ENV".to_string(), "staging".to_string());
        let resolver = NodeResolver::default();

        Pipeline::new(&options, &resolver, CancellationToken::new())
            .run()
            .unwrap();

        let script = fs::read_to_string(project.path().join("out/server/start.sh")).unwrap();
        assert!(script.contains("NODE_ENV='staging'"));
    }

    #[test]
    fn test_output_at_project_root_is_refused() {
        let project = project();
        write_file(project.path(), "src/routes.ts", "export {}");
        let options = BundleOptions::new(project.path().join("manifest.json"), project.path());
        let resolver = NodeResolver::default();

        let err = Pipeline::new(&options, &resolver, CancellationToken::new())
            .run()
            .unwrap_err();

        assert!(matches!(err, BundlerError::OutputOverlapsSources { .. }));
        assert_eq!(err.exit_code(), EXIT_IO);
        assert!(project.path().join("src/routes.ts").is_file());
        assert!(project.path().join("manifest.json").is_file());
        assert!(project.path().join("server.js").is_file());
        assert!(!is_incomplete(project.path()));
        assert!(!project.path().join(crate::materializer::LOCK_FILE).exists());
    }

    #[test]
    fn test_output_enclosing_a_source_is_refused() {
        let project = project();
        write_file(
            project.path(),
            "manifest.json",
            r#"{
                "version": 1,
                "entries": [{ "id": "server.js" }],
                "modules": [
                    { "id": "server.js", "references": [{ "request": "./out/generated" }] },
                    { "id": "out/generated.js" }
                ]
            }"#,
        );
        write_file(project.path(), "out/generated.js", "module.exports = 1");
        let options = options(project.path());
        let resolver = NodeResolver::default();

        let err = Pipeline::new(&options, &resolver, CancellationToken::new())
            .run()
            .unwrap_err();

        assert!(
            matches!(&err, BundlerError::OutputOverlapsSources { reason, .. } if reason.contains("out/generated.js"))
        );
        assert!(project.path().join("out/generated.js").is_file());
    }

    #[test]
    fn test_copy_failure_keeps_sentinel_and_skips_launcher() {
        let project = project();
        let options = options(project.path());
        // Listed by the build but gone from disk
        fs::remove_file(project.path().join("node_modules/a/index.js")).unwrap();
        let resolver = NodeResolver::default();
        let mut pipeline = Pipeline::new(&options, &resolver, CancellationToken::new());

        let err = pipeline.run().unwrap_err();

        assert!(matches!(err, BundlerError::CopyFailed { .. }));
        assert_eq!(err.exit_code(), EXIT_IO);
        assert!(matches!(pipeline.state(), RunState::Failed(_)));
        let out = project.path().join("out");
        assert!(is_incomplete(&out));
        assert!(!out.join("server/start.sh").exists());
    }
}
