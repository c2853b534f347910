//! Error types and handling for standalone
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Fatal failures are variants of [`BundlerError`] and abort the run. Conditions
//! that only degrade precision are collected as [`Warning`]s and reported in the
//! summary of a successful run.

mod warning;

#[cfg(test)]
mod tests;

use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

pub use warning::Warning;

/// Exit code for failures without a dedicated code
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for manifest and configuration errors
pub const EXIT_MANIFEST: i32 = 2;
/// Exit code for trace errors
pub const EXIT_TRACE: i32 = 3;
/// Exit code for I/O errors during planning or copying
pub const EXIT_IO: i32 = 4;
/// Exit code when another run owns the output directory
pub const EXIT_LOCKED: i32 = 5;
/// Exit code when the run was interrupted
pub const EXIT_CANCELLED: i32 = 130;

/// Main error type for standalone operations
#[derive(Error, Diagnostic, Debug)]
pub enum BundlerError {
    // Manifest errors
    #[error("Malformed build manifest at '{field}': {reason}")]
    #[diagnostic(
        code(standalone::manifest::malformed),
        help("The build manifest is produced by the build step; rebuild and try again")
    )]
    ManifestMalformed { field: String, reason: String },

    #[error("Failed to read build manifest: {path}: {reason}")]
    #[diagnostic(code(standalone::manifest::read_failed))]
    ManifestReadFailed { path: String, reason: String },

    // Configuration errors
    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(standalone::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Failed to read configuration file: {path}: {reason}")]
    #[diagnostic(code(standalone::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("No output directory configured")]
    #[diagnostic(
        code(standalone::config::missing_output),
        help("Pass --output or set `output` in standalone.yaml")
    )]
    MissingOutput,

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    #[diagnostic(
        code(standalone::config::invalid_glob),
        help("Patterns are matched against project-relative paths, e.g. 'public/**'")
    )]
    InvalidGlob { pattern: String, reason: String },

    // Trace errors
    #[error("Entry module '{entry}' does not exist in the module graph")]
    #[diagnostic(
        code(standalone::trace::unresolved_root),
        help("Pass an entry id listed in the manifest's modules, e.g. --entry server.js")
    )]
    UnresolvedRoot { entry: String },

    // Copy errors
    #[error("Failed to copy {path}: {reason}")]
    #[diagnostic(code(standalone::fs::copy_failed))]
    CopyFailed { path: String, reason: String },

    #[error("Conflicting sources for '{destination}': {first} and {second}")]
    #[diagnostic(
        code(standalone::plan::conflict),
        help("Two files map to the same output path; check include patterns and package roots")
    )]
    PlanConflict {
        destination: String,
        first: String,
        second: String,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(standalone::fs::io_error))]
    IoError { message: String },

    #[error("Output directory {output} {reason}")]
    #[diagnostic(
        code(standalone::output::overlaps_sources),
        help("Choose an --output directory outside the project, e.g. a sibling or a subdirectory")
    )]
    OutputOverlapsSources { output: String, reason: String },

    // Output ownership
    #[error("Output directory is in use by another run: {output}")]
    #[diagnostic(
        code(standalone::output::locked),
        help("Wait for the other run to finish or choose a different --output directory")
    )]
    ConcurrentRunConflict { output: String },

    #[error("Failed to lock output directory: {reason}")]
    #[diagnostic(code(standalone::output::lock_failed))]
    LockFailed { reason: String },

    #[error("Unsupported shell: {shell}")]
    #[diagnostic(
        code(standalone::cli::unsupported_shell),
        help("Supported shells: bash, elvish, fish, powershell, zsh")
    )]
    UnsupportedShell { shell: String },

    #[error("Run cancelled")]
    #[diagnostic(
        code(standalone::cancelled),
        help("The output directory is flagged incomplete; rerun to repair it")
    )]
    Cancelled,
}

impl BundlerError {
    /// Process exit code for this failure kind
    pub fn exit_code(&self) -> i32 {
        match self {
            BundlerError::ManifestMalformed { .. }
            | BundlerError::ManifestReadFailed { .. }
            | BundlerError::ConfigParseFailed { .. }
            | BundlerError::ConfigReadFailed { .. }
            | BundlerError::MissingOutput
            | BundlerError::InvalidGlob { .. } => EXIT_MANIFEST,
            BundlerError::UnresolvedRoot { .. } => EXIT_TRACE,
            BundlerError::CopyFailed { .. }
            | BundlerError::PlanConflict { .. }
            | BundlerError::OutputOverlapsSources { .. }
            | BundlerError::IoError { .. } => EXIT_IO,
            BundlerError::ConcurrentRunConflict { .. } | BundlerError::LockFailed { .. } => {
                EXIT_LOCKED
            }
            BundlerError::Cancelled => EXIT_CANCELLED,
            BundlerError::UnsupportedShell { .. } => EXIT_FAILURE,
        }
    }
}

/// Creates a malformed-manifest error for `field`
pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> BundlerError {
    BundlerError::ManifestMalformed {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Creates a copy error for `path`
pub fn copy_failed(path: &Path, err: impl std::fmt::Display) -> BundlerError {
    BundlerError::CopyFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

impl From<std::io::Error> for BundlerError {
    fn from(err: std::io::Error) -> Self {
        BundlerError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<walkdir::Error> for BundlerError {
    fn from(err: walkdir::Error) -> Self {
        BundlerError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, BundlerError>;
