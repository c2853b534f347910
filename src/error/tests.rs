//! Error type tests
//!
//! Tests for BundlerError, its conversions and exit codes.

#![allow(clippy::expect_used)]

use miette::Diagnostic;

use super::*;
use crate::graph::{ModuleId, PackageId};

macro_rules! test_error_contains {
    ($test_name:ident, $err:expr, $($contains:expr),+ $(,)?) => {
        #[test]
        fn $test_name() {
            let err = $err;
            let error_string = err.to_string();
            $(
                assert!(error_string.contains($contains),
                    "Error message should contain '{}', got: {}",
                    $contains,
                    error_string
                );
            )+
        }
    };
}

test_error_contains!(
    test_manifest_malformed_names_field,
    malformed("modules[3].id", "missing required field"),
    "modules[3].id",
    "missing required field"
);

test_error_contains!(
    test_unresolved_root_names_entry,
    BundlerError::UnresolvedRoot {
        entry: "server.js".to_string()
    },
    "server.js",
    "does not exist"
);

test_error_contains!(
    test_concurrent_run_conflict_names_output,
    BundlerError::ConcurrentRunConflict {
        output: "/tmp/out".to_string()
    },
    "/tmp/out",
    "another run"
);

test_error_contains!(
    test_plan_conflict_lists_both_sources,
    BundlerError::PlanConflict {
        destination: "app/a.js".to_string(),
        first: "a.js".to_string(),
        second: "b.js".to_string(),
    },
    "app/a.js",
    "a.js",
    "b.js"
);

#[test]
fn test_copy_failed_constructor() {
    let err = copy_failed(Path::new("/src/a.js"), "permission denied");
    assert!(matches!(err, BundlerError::CopyFailed { .. }));
    assert_eq!(err.to_string(), "Failed to copy /src/a.js: permission denied");
}

#[test]
fn test_error_code() {
    let err = BundlerError::UnresolvedRoot {
        entry: "x".to_string(),
    };
    assert_eq!(
        err.code().map(|c| c.to_string()),
        Some("standalone::trace::unresolved_root".to_string())
    );
}

#[test]
fn test_help_present_for_lock_conflict() {
    let err = BundlerError::ConcurrentRunConflict {
        output: "out".to_string(),
    };
    assert!(err.help().is_some());
}

#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: BundlerError = io_err.into();
    assert!(matches!(err, BundlerError::IoError { .. }));
    assert!(err.to_string().contains("IO error"));
}

#[test]
fn test_exit_codes_are_distinct_per_kind() {
    let manifest = malformed("version", "missing").exit_code();
    let trace = BundlerError::UnresolvedRoot {
        entry: "a".to_string(),
    }
    .exit_code();
    let io = copy_failed(Path::new("a"), "x").exit_code();
    let lock = BundlerError::ConcurrentRunConflict {
        output: "o".to_string(),
    }
    .exit_code();

    let codes = [manifest, trace, io, lock, BundlerError::Cancelled.exit_code()];
    for (i, a) in codes.iter().enumerate() {
        assert_ne!(*a, 0);
        for b in &codes[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert_eq!(manifest, EXIT_MANIFEST);
    assert_eq!(lock, EXIT_LOCKED);
}

#[test]
fn test_config_errors_share_manifest_exit_code() {
    let err = BundlerError::InvalidGlob {
        pattern: "[".to_string(),
        reason: "unclosed".to_string(),
    };
    assert_eq!(err.exit_code(), EXIT_MANIFEST);
    assert_eq!(BundlerError::MissingOutput.exit_code(), EXIT_MANIFEST);
}

#[test]
fn test_unsupported_shell_is_a_generic_failure() {
    let err = BundlerError::UnsupportedShell {
        shell: "tcsh".to_string(),
    };
    assert_eq!(err.exit_code(), EXIT_FAILURE);
}

#[test]
fn test_warning_display() {
    let warning = Warning::UnresolvedAmbiguousEdge {
        from: ModuleId::new("node_modules/d/index.js"),
        request: None,
        package: Some(PackageId::new("node_modules/d")),
    };
    let text = warning.to_string();
    assert!(text.contains("<computed>"));
    assert!(text.contains("node_modules/d in full"));

    let missing = Warning::MissingDependency {
        package: PackageId::new("node_modules/a"),
        dependency: "fsevents".to_string(),
        optional: true,
    };
    assert_eq!(
        missing.to_string(),
        "optional dependency 'fsevents' of node_modules/a is not installed"
    );
}
