//! Configuration management for the datamodel compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (nexus-compiler.toml)
//! - Environment variables (NEXUS__*)
//!
//! ## Example config file (nexus-compiler.toml):
//! ```toml
//! [datamodel]
//! base_domain = "tsm.example.com"
//! ignored_dirs = ["build", "vendor", "docs"]
//! manifest = "nexus.mod.toml"
//!
//! [output]
//! module_path = "example.com/generated/"
//! format = "pretty"
//! ```
//!
//! The loaded value is immutable and handed to the loader, graph builder and
//! compiler explicitly.

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Main configuration for the compiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CompilerConfig {
    /// Datamodel input settings
    #[serde(default)]
    pub datamodel: DatamodelConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Datamodel input configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatamodelConfig {
    /// Base domain appended to every resource id
    #[serde(default = "default_base_domain")]
    pub base_domain: String,

    /// Directory names skipped while walking the datamodel
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,

    /// Module manifest file name at the datamodel root
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Module path of generated code, passed through to generators
    #[serde(default)]
    pub module_path: Option<String>,

    /// JSON output format
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn to_json<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(match self {
            Self::Pretty => serde_json::to_string_pretty(value)?,
            Self::Compact => serde_json::to_string(value)?,
        })
    }
}

// Default value functions
fn default_base_domain() -> String {
    "tsm.tanzu.vmware.com".to_string()
}

/// Always skipped, in addition to anything configured
pub const ALWAYS_IGNORED_DIRS: &[&str] = &["build", "vendor"];

fn default_ignored_dirs() -> Vec<String> {
    vec![".git".to_string(), "target".to_string()]
}

fn default_manifest() -> String {
    "nexus.mod.toml".to_string()
}

impl Default for DatamodelConfig {
    fn default() -> Self {
        Self {
            base_domain: default_base_domain(),
            ignored_dirs: default_ignored_dirs(),
            manifest: default_manifest(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            module_path: None,
            format: OutputFormat::Pretty,
        }
    }
}

impl CompilerConfig {
    /// Defaults with a different base domain
    pub fn with_base_domain(base_domain: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.datamodel.base_domain = base_domain.into();
        config
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, optionally layering a specific file on top
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "nexus-compiler.toml",
            ".nexus-compiler.toml",
            "config/nexus-compiler.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "nexus", "nexus-compiler") {
            let xdg_config = config_dir.config_dir().join("nexus-compiler.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // NEXUS__DATAMODEL__BASE_DOMAIN=...
        builder = builder.add_source(
            Environment::with_prefix("NEXUS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// True if a directory with this name must not be walked
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        ALWAYS_IGNORED_DIRS.contains(&name) || self.datamodel.ignored_dirs.iter().any(|d| d == name)
    }

    /// Module manifest location under a datamodel root
    pub fn manifest_path(&self, root: &std::path::Path) -> PathBuf {
        root.join(&self.datamodel.manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.datamodel.base_domain, "tsm.tanzu.vmware.com");
        assert_eq!(config.datamodel.manifest, "nexus.mod.toml");
        assert_eq!(config.output.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_ignored_dirs() {
        let config = CompilerConfig::default();
        assert!(config.is_ignored_dir("build"));
        assert!(config.is_ignored_dir("vendor"));
        assert!(config.is_ignored_dir(".git"));
        assert!(!config.is_ignored_dir("config"));
    }

    #[test]
    fn test_serialize_config() {
        let config = CompilerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[datamodel]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[datamodel]\nbase_domain = \"helloworld.com\"\nignored_dirs = [\"docs\"]\n\n[output]\nformat = \"compact\"\n",
        )
        .unwrap();

        let config = CompilerConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.datamodel.base_domain, "helloworld.com");
        assert!(config.is_ignored_dir("docs"));
        assert_eq!(config.output.format, OutputFormat::Compact);
        assert_eq!(config.datamodel.manifest, "nexus.mod.toml");
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let config = CompilerConfig::with_base_domain("example.org");
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = CompilerConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.datamodel.base_domain, "example.org");
    }
}
