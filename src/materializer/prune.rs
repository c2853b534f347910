//! Removal of stale output files

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;
use crate::path_utils::to_forward_slashes;

/// Remove every file below `output` whose relative path is not in `keep`,
/// then every directory left empty. Returns the number of files removed.
pub fn prune(output: &Path, keep: &BTreeSet<String>) -> Result<usize> {
    let mut removed = 0;

    for entry in WalkDir::new(output).min_depth(1).contents_first(true) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(output) else {
            continue;
        };

        if entry.file_type().is_dir() {
            if fs::read_dir(entry.path())?.next().is_none() {
                fs::remove_dir(entry.path())?;
            }
            continue;
        }

        let relative = to_forward_slashes(relative);
        if !keep.contains(&relative) {
            debug!(file = %relative, "removing stale file");
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    Ok(removed)
}
