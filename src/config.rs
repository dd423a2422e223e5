//! Configuration for the resolver and suite harness
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (harness.toml)
//! - Environment variables (HARNESS__*)
//!
//! Configuration is always passed explicitly to the entry points that need
//! it; nothing here sets process-wide state.
//!
//! ## Example config file (harness.toml):
//! ```toml
//! [suite]
//! root = "./JSON-Schema-Test-Suite"
//! draft = "draft7"
//! include_optional = false
//!
//! [resolver]
//! local_authority = "localhost:1234"
//! max_depth = 32
//! read_timeout_ms = 10000
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::reference::DEFAULT_MAX_DEPTH;
use crate::resolver::DEFAULT_LOCAL_AUTHORITY;
use crate::suite::SuiteDraft;

/// Main configuration for the harness
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Conformance suite settings
    #[serde(default)]
    pub suite: SuiteConfig,

    /// Reference resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Checkout of the JSON-Schema-Test-Suite (holds `tests/` and `remotes/`)
    #[serde(default = "default_suite_root")]
    pub root: PathBuf,

    /// Draft whose cases are run
    #[serde(default = "default_draft")]
    pub draft: SuiteDraft,

    /// Also run `tests/<draft>/optional`
    #[serde(default)]
    pub include_optional: bool,

    /// Only run groups whose description matches this regex
    #[serde(default)]
    pub filter: Option<String>,
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Authority (`host[:port]`) that marks a reference as a local fixture
    #[serde(default = "default_local_authority")]
    pub local_authority: String,

    /// Bound on nested `$ref` chains
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Timeout for a single fixture read, in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_suite_root() -> PathBuf {
    PathBuf::from("JSON-Schema-Test-Suite")
}

fn default_draft() -> SuiteDraft {
    SuiteDraft::Draft7
}

fn default_local_authority() -> String {
    DEFAULT_LOCAL_AUTHORITY.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_read_timeout_ms() -> u64 {
    10_000
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            root: default_suite_root(),
            draft: default_draft(),
            include_optional: false,
            filter: None,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            local_authority: default_local_authority(),
            max_depth: default_max_depth(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl ResolverConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl HarnessConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "harness.toml",
            ".harness.toml",
            "config/harness.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "schema-ref-harness") {
            let xdg_config = config_dir.config_dir().join("harness.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // HARNESS__SUITE__ROOT, HARNESS__RESOLVER__MAX_DEPTH, ...
        builder = builder.add_source(
            Environment::with_prefix("HARNESS")
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

    /// Suite root, with relative paths resolved against the working directory
    pub fn suite_root(&self) -> PathBuf {
        if self.suite.root.is_absolute() {
            self.suite.root.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.suite.root)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.resolver.local_authority, "localhost:1234");
        assert_eq!(config.resolver.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.resolver.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.suite.draft, SuiteDraft::Draft7);
        assert!(!config.suite.include_optional);
    }

    #[test]
    fn test_serialize_config() {
        let config = HarnessConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[suite]"));
        assert!(toml_str.contains("[resolver]"));
        assert!(toml_str.contains("draft = \"draft7\""));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[suite]\nroot = \"/srv/suite\"\ndraft = \"draft4\"\n\n[resolver]\nlocal_authority = \"fixtures.test\"\n",
        )
        .unwrap();

        let config = HarnessConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.suite.draft, SuiteDraft::Draft4);
        assert_eq!(config.suite_root(), PathBuf::from("/srv/suite"));
        assert_eq!(config.resolver.local_authority, "fixtures.test");
        assert_eq!(config.resolver.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_save_round_trips_through_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = HarnessConfig::default();
        config.resolver.max_depth = 4;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = HarnessConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.resolver.max_depth, 4);
    }
}
