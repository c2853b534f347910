use std::path::PathBuf;

use clap::Parser;

/// Arguments for the bundle command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                   Bundle the entries declared by the build:\n    standalone bundle -m .next/standalone.json -o .standalone\n\n\
                   Bundle a single entry point:\n    standalone bundle -m build/manifest.json -o dist --entry server.js\n\n\
                   Show what would be copied:\n    standalone bundle -m build/manifest.json -o dist --dry-run")]
pub struct BundleArgs {
    /// Build manifest: a JSON file, or a directory of JSON files merged in name order
    #[arg(long, short = 'm', env = "STANDALONE_MANIFEST", value_name = "PATH")]
    pub manifest: PathBuf,

    /// Output directory (defaults to `output` from standalone.yaml)
    #[arg(long, short = 'o', env = "STANDALONE_OUTPUT", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Entry module id or alias; repeat for several entries. The first one is launched
    #[arg(long = "entry", short = 'e', value_name = "ID")]
    pub entries: Vec<String>,

    /// Maximum number of files copied in parallel (defaults to the CPU count)
    #[arg(long, short = 'j', env = "STANDALONE_CONCURRENCY", value_name = "N",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,

    /// Configuration file (defaults to standalone.yaml next to the manifest)
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show the plan without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress and summary output
    #[arg(long, short = 'q')]
    pub quiet: bool,
}
