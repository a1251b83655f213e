//! Lookup of projects already present in the local registry cache.
//!
//! Every failure here degrades to "absent": if a cached project cannot be
//! loaded, a fresh install from the registry is always a valid fallback.

use crate::config::QuarryConfig;
use crate::loader::ModuleLoader;
use crate::runner::{install_dependencies, CommandRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves projects from `<cache_root>/<name>/`.
pub struct LocalResolver<T: Send + 'static> {
    config: QuarryConfig,
    loader: Arc<dyn ModuleLoader<T>>,
    runner: Arc<dyn CommandRunner>,
}

impl<T: Send + 'static> LocalResolver<T> {
    pub fn new(
        config: QuarryConfig,
        loader: Arc<dyn ModuleLoader<T>>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            loader,
            runner,
        }
    }

    /// Find the entry module of a cached project.
    ///
    /// Only the project directory itself is scanned. Returns the absolute path
    /// of the entry module, or `None` when the directory is missing, unreadable
    /// or holds no entry module.
    pub fn find_project_index(&self, cache_root: &Path, name: &str) -> Option<PathBuf> {
        if name.trim().is_empty() {
            return None;
        }

        let project_dir = cache_root.join(name);
        let entries = match std::fs::read_dir(&project_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("{} not found in {}: {}", name, cache_root.display(), e);
                return None;
            }
        };

        let index = entries
            .filter_map(|entry| entry.ok())
            .find(|entry| {
                entry.file_name().to_string_lossy() == self.config.entry_module
                    && entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            })?
            .path();

        info!("{} found", name);
        Some(std::fs::canonicalize(&index).unwrap_or(index))
    }

    /// Load a cached project, or `None` if it is absent or broken.
    pub async fn find_locally(&self, cache_root: &Path, name: &str) -> Option<T> {
        let index = self.find_project_index(cache_root, name)?;
        let project_dir = cache_root.join(name);

        if let Err(e) =
            install_dependencies(self.runner.as_ref(), &self.config, name, &project_dir).await
        {
            warn!("Local project error for {}: {}", name, e);
            return None;
        }

        match self.loader.load(&index).await {
            Ok(project) => Some(project),
            Err(e) => {
                warn!("Local project error for {}: {}", name, e);
                None
            }
        }
    }
}
