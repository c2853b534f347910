//! CLI integration tests using the REAL standalone binary

mod common;

use common::standalone_cmd;
use predicates::prelude::*;

#[test]
fn test_help_output() {
    standalone_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("launcher script"))
        .stdout(predicate::str::contains("bundle"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_bundle_help_lists_flags() {
    standalone_cmd()
        .args(["bundle", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--manifest"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--entry"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_version_output() {
    standalone_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("standalone"))
        .stdout(predicate::str::contains("Build info"));
}

#[test]
fn test_completions_bash() {
    standalone_cmd()
        .args(["completions", "--shell", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("standalone"));
}

#[test]
fn test_completions_unknown_shell() {
    standalone_cmd()
        .args(["completions", "--shell", "tcsh"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unsupported shell"));
}

#[test]
fn test_bundle_requires_manifest() {
    standalone_cmd()
        .arg("bundle")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--manifest"));
}

#[test]
fn test_bundle_without_output_is_a_config_error() {
    let project = common::TestProject::new();
    project.write_manifest(serde_json::json!({
        "version": 1,
        "entries": [{"id": "server.js"}],
        "modules": [{"id": "server.js"}]
    }));

    standalone_cmd()
        .arg("bundle")
        .arg("-m")
        .arg(project.manifest_path())
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No output directory"));
}

#[test]
fn test_manifest_from_environment() {
    let project = common::TestProject::new();
    project.write_file("server.js", "");
    project.write_manifest(serde_json::json!({
        "version": 1,
        "entries": [{"id": "server.js"}],
        "modules": [{"id": "server.js"}]
    }));

    standalone_cmd()
        .env("STANDALONE_MANIFEST", project.manifest_path())
        .env("STANDALONE_OUTPUT", &project.output)
        .args(["bundle", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(project.output_exists("app/server.js"));
}
