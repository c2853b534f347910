//! Common test utilities for standalone integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;
use walkdir::WalkDir;

/// A built project in a temporary directory
///
/// Layout: `<temp>/project` holds the sources and installed packages,
/// `<temp>/project/.build/manifest.json` the build manifest, and `<temp>/out`
/// is the default output directory.
pub struct TestProject {
    pub temp: TempDir,
    pub root: PathBuf,
    pub output: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().join("project");
        let output = temp.path().join("out");
        std::fs::create_dir_all(&root).expect("Failed to create project directory");
        Self { temp, root, output }
    }

    /// Write a project file
    pub fn write_file(&self, path: &str, content: &str) -> &Self {
        let file_path = self.root.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        self
    }

    /// Write the build manifest; `projectRoot` points back at the project
    pub fn write_manifest(&self, manifest: serde_json::Value) -> &Self {
        let mut manifest = manifest;
        if let Some(object) = manifest.as_object_mut() {
            object
                .entry("projectRoot")
                .or_insert_with(|| serde_json::Value::from(".."));
        }
        let json = serde_json::to_string_pretty(&manifest).expect("Failed to encode manifest");
        self.write_file(".build/manifest.json", &json)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(".build").join("manifest.json")
    }

    /// `standalone bundle -m <manifest> -o <output> -q`
    pub fn bundle(&self) -> Command {
        let mut cmd = standalone_cmd();
        cmd.current_dir(&self.root)
            .arg("bundle")
            .arg("-m")
            .arg(self.manifest_path())
            .arg("-o")
            .arg(&self.output)
            .arg("-q");
        cmd
    }

    pub fn output_file(&self, path: &str) -> PathBuf {
        self.output.join(path)
    }

    pub fn read_output(&self, path: &str) -> String {
        std::fs::read_to_string(self.output.join(path)).expect("Failed to read output file")
    }

    pub fn output_exists(&self, path: &str) -> bool {
        self.output.join(path).exists()
    }
}

/// Command for the standalone binary with its environment fallbacks cleared
// Temporary fix for deprecated cargo_bin - will be updated when build-dir issues are resolved
#[allow(deprecated)]
pub fn standalone_cmd() -> Command {
    let mut cmd = Command::cargo_bin("standalone").expect("Failed to find standalone binary");
    cmd.env_remove("STANDALONE_MANIFEST")
        .env_remove("STANDALONE_OUTPUT")
        .env_remove("STANDALONE_CONCURRENCY")
        .env_remove("RUST_LOG");
    cmd
}

/// Relative path -> contents of every file under `dir`
pub fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(dir)
                .expect("Walked path is under the root")
                .to_string_lossy()
                .replace('\\', "/");
            let contents = std::fs::read(entry.path()).expect("Failed to read file");
            (relative, contents)
        })
        .collect()
}

/// Relative paths of every file under `dir`
pub fn file_list(dir: &Path) -> Vec<String> {
    snapshot(dir).into_keys().collect()
}
