//! Atomic file replacement
//!
//! Content is written to a temporary file in the destination's own directory and
//! renamed over the destination, so readers never see a half-written file and an
//! interrupted run leaves at most a stray temporary file behind.

use std::fs::{self, File, Permissions};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Prefix of temporary files, so stale ones can be recognised and pruned
pub const TEMP_PREFIX: &str = ".standalone-tmp";

fn temp_file_for(dest: &Path) -> io::Result<NamedTempFile> {
    let dir = dest
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    fs::create_dir_all(dir)?;
    tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)
}

/// Replace `dest` with `contents`
pub fn write_atomic(dest: &Path, contents: &[u8], permissions: Option<Permissions>) -> io::Result<()> {
    let mut temp = temp_file_for(dest)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    if let Some(permissions) = permissions {
        fs::set_permissions(temp.path(), permissions)?;
    }
    temp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Replace `dest` with a copy of `src`, carrying over its permissions
pub fn copy_atomic(src: &Path, dest: &Path) -> io::Result<()> {
    let mut source = File::open(src)?;
    let permissions = source.metadata()?.permissions();

    let mut temp = temp_file_for(dest)?;
    io::copy(&mut source, temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), permissions)?;
    temp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
