//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - bundle: Bundle command arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};

pub mod bundle;
pub mod completions;

pub use bundle::BundleArgs;
pub use completions::CompletionsArgs;

/// standalone - standalone application bundler
///
/// Copies only what a built server application needs at runtime into a
/// self-contained directory with a launcher.
#[derive(Parser, Debug)]
#[command(
    name = "standalone",
    author,
    version,
    color = clap::ColorChoice::Auto,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Bundle a built server application into a standalone directory",
    long_about = "standalone traces which application files and installed packages a built server \
                  application reaches from its entry points, copies exactly those into an output \
                  directory, and writes a launcher script. The result runs without a package install.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  standalone bundle -m build/manifest.json -o .standalone   \x1b[90m# Bundle declared entries\x1b[0m\n   \
                  standalone bundle -m build -o dist --entry server.js     \x1b[90m# Bundle one entry\x1b[0m\n   \
                  standalone bundle -m build -o dist --dry-run              \x1b[90m# Show the plan only\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Trace the build output and write a standalone bundle
    Bundle(BundleArgs),

    /// Show version information
    #[command(hide = true)]
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}
