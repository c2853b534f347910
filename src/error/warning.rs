//! Non-fatal conditions collected during a run

use std::fmt;

use serde::Serialize;

use crate::graph::{ModuleId, PackageId};

/// A condition that makes the bundle more conservative but does not abort the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// A reference whose target cannot be determined statically
    #[serde(rename_all = "camelCase")]
    UnresolvedAmbiguousEdge {
        from: ModuleId,
        request: Option<String>,
        /// Package copied in full because of this edge
        package: Option<PackageId>,
    },

    /// A declared dependency that is not installed anywhere visible
    #[serde(rename_all = "camelCase")]
    MissingDependency {
        package: PackageId,
        dependency: String,
        optional: bool,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnresolvedAmbiguousEdge {
                from,
                request,
                package,
            } => {
                let request = request.as_deref().unwrap_or("<computed>");
                match package {
                    Some(package) => write!(
                        f,
                        "ambiguous reference '{request}' from {from}; copying {package} in full"
                    ),
                    None => write!(f, "ambiguous reference '{request}' from {from}"),
                }
            }
            Warning::MissingDependency {
                package,
                dependency,
                optional,
            } => {
                let kind = if *optional { "optional dependency" } else { "dependency" };
                write!(f, "{kind} '{dependency}' of {package} is not installed")
            }
        }
    }
}
