//! Output directory ownership and validity markers
//!
//! ```text
//! <output>/
//! ├── .standalone.lock        # advisory lock held for the whole run
//! ├── .standalone-incomplete  # sentinel, removed only when a run succeeds
//! ├── app/                    # project layout, packages included
//! │   └── node_modules/
//! ├── server/start.sh
//! └── standalone-manifest.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use fslock::LockFile;
use tracing::debug;

use crate::error::{BundlerError, Result};

/// Lock file for output ownership
pub const LOCK_FILE: &str = ".standalone.lock";

/// Marker flagging the output tree as invalid
pub const SENTINEL_FILE: &str = ".standalone-incomplete";

/// RAII guard for output ownership
///
/// Acquires an advisory file lock on creation and releases it on drop.
/// This prevents two runs from writing the same output directory.
#[derive(Debug)]
pub struct OutputGuard {
    lock: LockFile,
    lock_path: PathBuf,
}

impl OutputGuard {
    /// Try to take ownership of `output` without blocking.
    ///
    /// Creates the directory if needed. Returns `None` if another run holds it.
    pub fn try_acquire(output: &Path) -> Result<Option<Self>> {
        fs::create_dir_all(output).map_err(|e| BundlerError::LockFailed {
            reason: format!("Failed to create output directory {}: {}", output.display(), e),
        })?;
        let lock_path = output.join(LOCK_FILE);

        let mut lock = LockFile::open(&lock_path).map_err(|e| BundlerError::LockFailed {
            reason: format!("Failed to open lock file: {}", e),
        })?;

        // Try to acquire without blocking
        let acquired = lock.try_lock().map_err(|e| BundlerError::LockFailed {
            reason: format!("Failed to try lock: {}", e),
        })?;

        if acquired {
            debug!(lock = %lock_path.display(), "acquired output lock");
            Ok(Some(Self { lock, lock_path }))
        } else {
            Ok(None)
        }
    }

    /// Take ownership of `output` or fail with `ConcurrentRunConflict`
    pub fn acquire(output: &Path) -> Result<Self> {
        Self::try_acquire(output)?.ok_or_else(|| BundlerError::ConcurrentRunConflict {
            output: output.display().to_string(),
        })
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        // The lock file is left in place so every run locks the same inode.
        let _ = self.lock.unlock();
        debug!(lock = %self.lock_path.display(), "released output lock");
    }
}

/// Flag `output` as invalid until [`clear_incomplete`] runs
pub fn mark_incomplete(output: &Path) -> Result<()> {
    fs::write(
        output.join(SENTINEL_FILE),
        "standalone: bundle incomplete, rerun to repair\n",
    )?;
    Ok(())
}

/// Flag `output` as valid again
pub fn clear_incomplete(output: &Path) -> Result<()> {
    match fs::remove_file(output.join(SENTINEL_FILE)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// True if the last run on `output` did not finish
pub fn is_incomplete(output: &Path) -> bool {
    output.join(SENTINEL_FILE).exists()
}
