//! Bundler configuration (standalone.yaml)

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BundlerError, Result};
use crate::launcher::is_valid_env_name;

/// Configuration file name looked up next to the build manifest
pub const CONFIG_FILE: &str = "standalone.yaml";

/// Bundler configuration from standalone.yaml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StandaloneConfig {
    /// Output directory; relative paths are taken from the config file's directory
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Maximum number of parallel copies
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Retries for transient I/O errors per file
    #[serde(default)]
    pub retries: Option<u32>,

    /// Entry points, overriding the manifest's
    #[serde(default)]
    pub entries: Vec<String>,

    /// Environment defaults, overriding the manifest's
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Globs of extra project files to bundle (e.g. `public/**`)
    #[serde(default)]
    pub include: Vec<String>,

    /// Globs of planned files to leave out (e.g. `**/*.map`)
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub launcher: LauncherConfig,
}

/// Launcher settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LauncherConfig {
    /// Script file name under `server/`
    #[serde(default)]
    pub name: Option<String>,

    /// Runtime command, overriding the manifest's
    #[serde(default)]
    pub runtime: Option<String>,

    /// Arguments passed to the runtime before the entry module
    #[serde(default)]
    pub args: Vec<String>,
}

impl StandaloneConfig {
    /// Parse configuration from a YAML string; `path` is used in error messages
    pub fn from_yaml(yaml: &str, path: &Path) -> Result<Self> {
        let parse_failed = |reason: String| BundlerError::ConfigParseFailed {
            path: path.display().to_string(),
            reason,
        };

        // An empty file is a valid, empty configuration.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(yaml).map_err(|e| parse_failed(e.to_string()))?;
        config.validate().map_err(parse_failed)?;
        Ok(config)
    }

    /// Read and parse the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path).map_err(|e| BundlerError::ConfigReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config = Self::from_yaml(&yaml, path)?;

        if let (Some(output), Some(dir)) = (&config.output, path.parent()) {
            if output.is_relative() {
                config.output = Some(dir.join(output));
            }
        }
        Ok(config)
    }

    /// Find `standalone.yaml` next to the build manifest
    pub fn discover(manifest: &Path) -> Result<Option<(PathBuf, Self)>> {
        let dir = if manifest.is_dir() {
            manifest
        } else {
            manifest.parent().unwrap_or_else(|| Path::new("."))
        };
        let candidate = dir.join(CONFIG_FILE);
        if !candidate.is_file() {
            return Ok(None);
        }
        let config = Self::load(&candidate)?;
        Ok(Some((candidate, config)))
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.concurrency == Some(0) {
            return Err("concurrency must be at least 1".to_string());
        }
        if let Some(name) = self.env.keys().find(|name| !is_valid_env_name(name)) {
            return Err(format!("invalid environment variable name '{name}'"));
        }
        if let Some(name) = &self.launcher.name {
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(format!("launcher name '{name}' must be a plain file name"));
            }
        }
        if self.entries.iter().any(String::is_empty) {
            return Err("entries must not be empty strings".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{create_temp_dir, write_file};

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
output: .standalone
concurrency: 8
retries: 5
entries: [server.js]
env: { PORT: "3000" }
include: ["public/**"]
exclude: ["**/*.map"]
launcher: { name: run.sh, runtime: bun, args: ["--smol"] }
"#;
        let config = StandaloneConfig::from_yaml(yaml, Path::new(CONFIG_FILE)).unwrap();

        assert_eq!(config.output, Some(PathBuf::from(".standalone")));
        assert_eq!(config.concurrency, Some(8));
        assert_eq!(config.retries, Some(5));
        assert_eq!(config.entries, vec!["server.js".to_string()]);
        assert_eq!(config.env.get("PORT"), Some(&"3000".to_string()));
        assert_eq!(config.launcher.name.as_deref(), Some("run.sh"));
        assert_eq!(config.launcher.args, vec!["--smol".to_string()]);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = StandaloneConfig::from_yaml("\n", Path::new(CONFIG_FILE)).unwrap();
        assert_eq!(config, StandaloneConfig::default());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = StandaloneConfig::from_yaml("outptu: dist\n", Path::new(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, BundlerError::ConfigParseFailed { .. }));
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let err = StandaloneConfig::from_yaml("concurrency: 0\n", Path::new(CONFIG_FILE)).unwrap_err();
        assert!(err.to_string().contains("concurrency must be at least 1"));
    }

    #[test]
    fn test_launcher_name_with_separator_is_rejected() {
        let err = StandaloneConfig::from_yaml(
            "launcher: { name: ../start.sh }\n",
            Path::new(CONFIG_FILE),
        )
        .unwrap_err();
        assert!(err.to_string().contains("plain file name"));
    }

    #[test]
    fn test_invalid_env_name_is_rejected() {
        let err = StandaloneConfig::from_yaml("env: { \"1PORT\": x }\n", Path::new(CONFIG_FILE))
            .unwrap_err();
        assert!(err.to_string().contains("1PORT"));
    }

    #[test]
    fn test_discover_next_to_manifest() {
        let temp = create_temp_dir();
        let manifest = write_file(temp.path(), "build/manifest.json", "{}");
        assert!(StandaloneConfig::discover(&manifest).unwrap().is_none());

        write_file(temp.path(), "build/standalone.yaml", "output: out\n");
        let (path, config) = StandaloneConfig::discover(&manifest).unwrap().unwrap();

        assert_eq!(path, temp.path().join("build").join(CONFIG_FILE));
        assert_eq!(config.output, Some(temp.path().join("build").join("out")));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let temp = create_temp_dir();
        let err = StandaloneConfig::load(&temp.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, BundlerError::ConfigReadFailed { .. }));
    }
}
