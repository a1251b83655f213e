//! Centralized configuration for Quarry.
//!
//! Constant holders describe the fixed parts of the registry contract and the
//! on-disk layout. [`QuarryConfig`] carries the values a deployment may
//! override, loaded from a JSON file or built in code.

use crate::error::{QuarryError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Registry and cache layout constants.
pub struct RegistryConfig;

impl RegistryConfig {
    /// Path segment appended to `<registry>/<name>` to fetch metadata.
    pub const LATEST_TAG: &'static str = "latest";
    /// Marker some registries append to tarball file names.
    pub const LATEST_MARKER: &'static str = "-latest";
    /// Root directory npm-style tarballs wrap their content in.
    pub const ARCHIVE_ROOT_PREFIX: &'static str = "package/";
    /// File whose contents are the project's loadable value.
    pub const ENTRY_MODULE: &'static str = "index.json";
    /// Directory whose presence means dependencies are installed.
    pub const DEPENDENCIES_DIR: &'static str = "node_modules";
    /// Dependency installer program and its arguments.
    pub const INSTALL_PROGRAM: &'static str = "bun";
    pub const INSTALL_ARGS: &'static [&'static str] = &["install"];
    /// Directory under the cache root holding per-project lock files.
    pub const LOCKS_DIR_NAME: &'static str = ".locks";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
    pub const USER_AGENT: &'static str = concat!("quarry/", env!("CARGO_PKG_VERSION"));
}

/// Runtime configuration for a resolution pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarryConfig {
    /// Base URL of the package registry, without trailing slash.
    pub registry_url: String,
    /// Root of the local registry cache.
    pub cache_root: PathBuf,
    /// Entry module file name looked up inside a project directory.
    pub entry_module: String,
    /// Dependency marker directory inside a project directory.
    pub dependencies_dir: String,
    /// Program run to install a project's dependencies.
    pub install_program: String,
    /// Arguments passed to `install_program`.
    pub install_args: Vec<String>,
    /// Prefix stripped from archive entry paths before writing.
    pub archive_root_prefix: String,
    /// Ignore a non-zero exit status from the dependency installer.
    pub lenient_dependency_install: bool,
    /// Connection timeout for registry requests, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for QuarryConfig {
    fn default() -> Self {
        Self {
            registry_url: String::new(),
            cache_root: PathBuf::from("projects"),
            entry_module: RegistryConfig::ENTRY_MODULE.to_string(),
            dependencies_dir: RegistryConfig::DEPENDENCIES_DIR.to_string(),
            install_program: RegistryConfig::INSTALL_PROGRAM.to_string(),
            install_args: RegistryConfig::INSTALL_ARGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            archive_root_prefix: RegistryConfig::ARCHIVE_ROOT_PREFIX.to_string(),
            lenient_dependency_install: false,
            connect_timeout_secs: NetworkConfig::CONNECT_TIMEOUT.as_secs(),
        }
    }
}

impl QuarryConfig {
    /// Create a configuration for the given registry and cache root.
    pub fn new(registry_url: impl Into<String>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            registry_url: registry_url.into(),
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| QuarryError::io_with_path(e, path))?;

        let config: QuarryConfig = serde_json::from_str(&content).map_err(|e| QuarryError::Json {
            message: format!("Failed to parse config from {}: {}", path.display(), e),
            source: Some(e),
        })?;

        Ok(config)
    }

    /// Check that the values needed by the pipeline are present.
    pub fn validate(&self) -> Result<()> {
        if self.registry_url.trim().is_empty() {
            return Err(QuarryError::Config {
                message: "registry_url must not be empty".to_string(),
            });
        }
        if self.entry_module.trim().is_empty() {
            return Err(QuarryError::Config {
                message: "entry_module must not be empty".to_string(),
            });
        }
        if self.install_program.trim().is_empty() {
            return Err(QuarryError::Config {
                message: "install_program must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Registry URL with any trailing slash removed.
    pub fn registry_base(&self) -> &str {
        self.registry_url.trim_end_matches('/')
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn with_entry_module(mut self, entry_module: impl Into<String>) -> Self {
        self.entry_module = entry_module.into();
        self
    }

    pub fn with_install_command(mut self, program: impl Into<String>, args: &[&str]) -> Self {
        self.install_program = program.into();
        self.install_args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_lenient_dependency_install(mut self, lenient: bool) -> Self {
        self.lenient_dependency_install = lenient;
        self
    }
}
