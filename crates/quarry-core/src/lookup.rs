//! Project lookup: local cache first, registry install as fallback.

use crate::config::QuarryConfig;
use crate::error::Result;
use crate::installer::ProjectInstaller;
use crate::loader::{JsonModuleLoader, ModuleLoader};
use crate::local::LocalResolver;
use crate::registry::RegistryClient;
use crate::runner::{CommandRunner, ProcessRunner};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Identity of a project in the cache and in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectDescriptor {
    pub name: String,
}

impl ProjectDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Resolves projects one at a time, in input order.
pub struct ProjectLookup<T: Send + 'static> {
    config: QuarryConfig,
    local: LocalResolver<T>,
    installer: ProjectInstaller<T>,
}

impl<T: Send + 'static> ProjectLookup<T> {
    /// Create a lookup with explicit loader and command runner.
    pub fn new(
        config: QuarryConfig,
        loader: Arc<dyn ModuleLoader<T>>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let registry = RegistryClient::with_connect_timeout(config.connect_timeout())?;
        Ok(Self {
            local: LocalResolver::new(config.clone(), loader.clone(), runner.clone()),
            installer: ProjectInstaller::new(config.clone(), registry, loader, runner),
            config,
        })
    }

    pub fn config(&self) -> &QuarryConfig {
        &self.config
    }

    /// Install a project, logging and swallowing any failure.
    pub async fn install_for(&self, project: &ProjectDescriptor) -> Option<T> {
        match self
            .installer
            .install(
                self.config.registry_base(),
                &self.config.cache_root,
                &project.name,
            )
            .await
        {
            Ok(value) => Some(value),
            Err(e) => {
                error!(
                    stage = e.stage(),
                    "Failed to download project for namespace: {}: {}", project.name, e
                );
                None
            }
        }
    }

    /// Resolve one project from the cache, falling back to the registry.
    pub async fn resolve(&self, project: &ProjectDescriptor) -> Option<T> {
        match self
            .local
            .find_locally(&self.config.cache_root, &project.name)
            .await
        {
            Some(value) => Some(value),
            None => self.install_for(project).await,
        }
    }

    /// Resolve every name, dropping the ones that cannot be resolved.
    pub async fn resolve_all<I>(&self, names: I) -> Vec<T>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        info!("Looking up for projects");

        let mut projects = Vec::new();
        let mut requested = 0usize;
        for name in names {
            requested += 1;
            let descriptor = ProjectDescriptor::new(name.as_ref());
            if let Some(project) = self.resolve(&descriptor).await {
                projects.push(project);
            }
        }

        info!("Resolved {} of {} projects", projects.len(), requested);
        projects
    }
}

impl<T> ProjectLookup<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Create a lookup loading JSON entry modules and installing dependencies
    /// with a child process.
    pub fn with_defaults(config: QuarryConfig) -> Result<Self> {
        Self::new(
            config,
            Arc::new(JsonModuleLoader::<T>::new()),
            Arc::new(ProcessRunner),
        )
    }
}

/// Resolve `names` against `registry_url`, caching installs under `cache_root`.
pub async fn lookup_for_projects<T>(
    registry_url: &str,
    cache_root: impl AsRef<Path>,
    names: &[&str],
) -> Result<Vec<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let config = QuarryConfig::new(registry_url, cache_root.as_ref());
    let lookup = ProjectLookup::with_defaults(config)?;
    Ok(lookup.resolve_all(names).await)
}
