//! BLAKE3 hashing utilities for copy skipping and the audit manifest

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake3::Hasher;
use walkdir::WalkDir;

use crate::error::{BundlerError, Result, copy_failed};

/// Hash prefix for BLAKE3 hashes
pub const HASH_PREFIX: &str = "blake3:";

/// Calculate BLAKE3 hash of a file
pub fn hash_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| copy_failed(path, e))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| copy_failed(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{}{}", HASH_PREFIX, hasher.finalize().to_hex()))
}

/// Calculate BLAKE3 hash of a directory tree
///
/// Hashes relative paths and contents of all files, sorted by path for
/// deterministic results. Files whose name is in `exclude` are skipped.
pub fn hash_tree(path: &Path, exclude: &[&str]) -> Result<String> {
    if !path.is_dir() {
        return Err(BundlerError::IoError {
            message: format!("not a directory: {}", path.display()),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() && !exclude.contains(&name.as_ref()) {
            files.push(entry.into_path());
        }
    }

    let mut hasher = Hasher::new();
    for file in files {
        let relative = file.strip_prefix(path).unwrap_or(&file).to_string_lossy();
        hasher.update(relative.replace('\\', "/").as_bytes());
        hasher.update(b"\0");
        hasher.update(hash_file(&file)?.as_bytes());
        hasher.update(b"\0");
    }

    Ok(format!("{}{}", HASH_PREFIX, hasher.finalize().to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");
        std::fs::write(&file_path, "test content").unwrap();

        let hash = hash_file(&file_path).unwrap();
        assert!(hash.starts_with(HASH_PREFIX));
        assert_eq!(hash, hash_file(&file_path).unwrap());
    }

    #[test]
    fn test_hash_file_not_found() {
        let result = hash_file(Path::new("/nonexistent/file.txt"));
        assert!(matches!(result, Err(BundlerError::CopyFailed { .. })));
    }

    #[test]
    fn test_hash_tree_changes_with_content_and_layout() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "aaa").unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("sub/b.txt"), "bbb").unwrap();

        let first = hash_tree(temp.path(), &[]).unwrap();
        assert_eq!(first, hash_tree(temp.path(), &[]).unwrap());

        std::fs::rename(temp.path().join("sub/b.txt"), temp.path().join("b.txt")).unwrap();
        assert_ne!(first, hash_tree(temp.path(), &[]).unwrap());
    }

    #[test]
    fn test_hash_tree_excludes_named_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("file.txt"), "content").unwrap();
        let before = hash_tree(temp.path(), &[".standalone.lock"]).unwrap();

        std::fs::write(temp.path().join(".standalone.lock"), "").unwrap();
        let after = hash_tree(temp.path(), &[".standalone.lock"]).unwrap();

        assert_eq!(before, after);
    }
}
