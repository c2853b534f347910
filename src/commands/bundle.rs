//! Bundle command implementation
//!
//! Merges command-line flags with `standalone.yaml` and runs the pipeline.
//! Flags win over the configuration file; unset values fall back to defaults.

use std::path::PathBuf;

use tracing::debug;

use crate::cancel::CancellationToken;
use crate::cli::BundleArgs;
use crate::config::StandaloneConfig;
use crate::error::{BundlerError, Result};
use crate::materializer::default_concurrency;
use crate::pipeline::{BundleOptions, Pipeline, RunSummary};
use crate::resolver::NodeResolver;
use crate::ui;

/// Run bundle command
pub fn run(args: BundleArgs, cancel: CancellationToken) -> Result<RunSummary> {
    let config = load_config(&args)?;
    let options = options_from(args, config)?;

    let resolver = NodeResolver::default();
    let summary = Pipeline::new(&options, &resolver, cancel).run()?;

    if !options.quiet {
        if options.dry_run {
            ui::display_plan(&summary);
        }
        ui::display_summary(&summary);
    }
    Ok(summary)
}

fn load_config(args: &BundleArgs) -> Result<StandaloneConfig> {
    if let Some(path) = &args.config {
        return StandaloneConfig::load(path);
    }
    match StandaloneConfig::discover(&args.manifest)? {
        Some((path, config)) => {
            debug!(config = %path.display(), "using discovered configuration");
            Ok(config)
        }
        None => Ok(StandaloneConfig::default()),
    }
}

fn options_from(args: BundleArgs, config: StandaloneConfig) -> Result<BundleOptions> {
    let output: PathBuf = args
        .output
        .or(config.output)
        .ok_or(BundlerError::MissingOutput)?;

    let mut options = BundleOptions::new(args.manifest, output);
    options.entries = if args.entries.is_empty() {
        config.entries
    } else {
        args.entries
    };
    options.concurrency = args
        .concurrency
        .map(|n| n as usize)
        .or(config.concurrency)
        .unwrap_or_else(default_concurrency);
    if let Some(retries) = config.retries {
        options.retries = retries;
    }
    options.env = config.env;
    options.include = config.include;
    options.exclude = config.exclude;
    options.launcher = config.launcher;
    options.dry_run = args.dry_run;
    options.quiet = args.quiet;
    Ok(options)
}
