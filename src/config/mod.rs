//! Configuration file handling for standalone
//!
//! This module contains data structures for:
//! - the build manifest written by the build step (JSON, read only)
//! - `standalone.yaml` - bundler configuration
//! - `standalone-manifest.json` - audit manifest written into every bundle

pub mod audit;
pub mod manifest;
pub mod settings;

pub use audit::{AUDIT_FILE, AuditManifest};
pub use manifest::BuildManifest;
pub use settings::{CONFIG_FILE, LauncherConfig, StandaloneConfig};
