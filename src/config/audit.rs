//! Audit manifest (standalone-manifest.json)
//!
//! Lists what a bundle contains and why. The file is deterministic: entries are
//! sorted and no timestamps are recorded, so two runs over the same inputs
//! produce byte-identical manifests.

use serde::{Deserialize, Serialize};

use crate::error::{BundlerError, Result};

/// File name of the audit manifest inside the output directory
pub const AUDIT_FILE: &str = "standalone-manifest.json";

/// Audit manifest format version
pub const AUDIT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditManifest {
    pub version: u32,

    /// Entry module the launcher starts
    pub entry: String,

    /// Launcher path relative to the output directory
    pub launcher: String,

    pub runtime: String,

    /// Bundled files, sorted by destination
    pub files: Vec<AuditFile>,

    /// Included packages, sorted by installation root
    pub packages: Vec<AuditPackage>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguous_edges: Vec<AuditEdge>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFile {
    /// Path relative to the output directory
    pub destination: String,
    /// Path relative to the project root
    pub source: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// BLAKE3 content hash (`blake3:<hex>`)
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPackage {
    /// Installation root relative to the project root
    pub root: String,
    pub name: String,
    pub version: String,
    /// `partial` or `full`
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEdge {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl AuditManifest {
    /// Parse an audit manifest from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BundlerError::IoError {
            message: format!("invalid {AUDIT_FILE}: {e}"),
        })
    }

    /// Serialize to pretty-printed JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| BundlerError::IoError {
            message: format!("failed to serialize {AUDIT_FILE}: {e}"),
        })?;
        json.push('\n');
        Ok(json)
    }
}
