//! Parallel copy of the bundle plan
//!
//! Each destination is replaced atomically and skipped when its content hash and
//! permissions already match the source. Copies run in a dedicated `rayon` pool
//! so the concurrency bound does not leak into the global pool.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, trace};

use super::plan::CopyInstruction;
use crate::cancel::CancellationToken;
use crate::error::{BundlerError, Result, copy_failed};
use crate::hash::hash_file;
use crate::progress::ProgressDisplay;
use crate::temp::copy_atomic;

/// Tuning of the copy phase
#[derive(Debug, Clone, Copy)]
pub struct CopyOptions {
    /// Maximum number of files copied at once
    pub concurrency: usize,
    /// Extra attempts after a transient I/O error
    pub retries: u32,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retries: 3,
        }
    }
}

/// Number of available CPUs, at least one
pub fn default_concurrency() -> usize {
    thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Result of copying one instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub destination: String,
    pub hash: String,
    /// False when the destination was already up to date
    pub copied: bool,
}

/// Totals of a copy phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub copied: usize,
    pub skipped: usize,
}

/// Copy every instruction into `output`.
///
/// Returns one outcome per instruction, in plan order.
pub fn copy_all(
    instructions: &[CopyInstruction],
    output: &Path,
    options: CopyOptions,
    cancel: &CancellationToken,
    progress: &ProgressDisplay,
) -> Result<(Vec<CopyOutcome>, CopyStats)> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.concurrency.max(1))
        .build()
        .map_err(|e| BundlerError::IoError {
            message: format!("failed to start copy workers: {e}"),
        })?;

    let copied = AtomicUsize::new(0);
    let result: Result<Vec<CopyOutcome>> = pool.install(|| {
        instructions
            .par_iter()
            .map(|instruction| {
                let outcome = copy_one(instruction, output, options.retries, cancel)?;
                if outcome.copied {
                    copied.fetch_add(1, Ordering::Relaxed);
                }
                progress.update_file(&instruction.destination);
                Ok(outcome)
            })
            .collect()
    });

    // Workers racing a cancellation may fail with unrelated errors; report the cancellation.
    cancel.check()?;
    let outcomes = result?;

    let copied = copied.into_inner();
    let stats = CopyStats {
        copied,
        skipped: outcomes.len() - copied,
    };
    debug!(copied = stats.copied, skipped = stats.skipped, "copy phase complete");
    Ok((outcomes, stats))
}

fn copy_one(
    instruction: &CopyInstruction,
    output: &Path,
    retries: u32,
    cancel: &CancellationToken,
) -> Result<CopyOutcome> {
    cancel.check()?;

    let source = &instruction.source;
    let destination = output.join(&instruction.destination);
    let hash = hash_file(source)?;

    if is_up_to_date(source, &destination, &hash) {
        trace!(file = %instruction.destination, "up to date");
        return Ok(CopyOutcome {
            destination: instruction.destination.clone(),
            hash,
            copied: false,
        });
    }

    with_retries(retries, || copy_atomic(source, &destination))
        .map_err(|e| copy_failed(source, e))?;
    trace!(file = %instruction.destination, "copied");

    Ok(CopyOutcome {
        destination: instruction.destination.clone(),
        hash,
        copied: true,
    })
}

fn is_up_to_date(source: &Path, destination: &Path, source_hash: &str) -> bool {
    let (Ok(src_meta), Ok(dest_meta)) = (fs::metadata(source), fs::metadata(destination)) else {
        return false;
    };
    dest_meta.is_file()
        && src_meta.len() == dest_meta.len()
        && src_meta.permissions() == dest_meta.permissions()
        && hash_file(destination).is_ok_and(|hash| hash == source_hash)
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Run `op`, retrying transient failures up to `retries` more times
fn with_retries<T>(retries: u32, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(e) if is_transient(&e) && attempt < retries => {
                attempt += 1;
                debug!(attempt, error = %e, "transient I/O error, retrying");
                thread::sleep(Duration::from_millis(10 * u64::from(attempt)));
            }
            result => return result,
        }
    }
}
