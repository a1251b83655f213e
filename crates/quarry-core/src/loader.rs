//! Loading a project's value from its entry module.

use crate::error::{QuarryError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

/// Obtains the value a project exports from the path of its entry module.
#[async_trait]
pub trait ModuleLoader<T: Send + 'static>: Send + Sync {
    async fn load(&self, entry_module: &Path) -> Result<T>;
}

/// Loads a project by deserializing its entry module as JSON.
pub struct JsonModuleLoader<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonModuleLoader<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonModuleLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> ModuleLoader<T> for JsonModuleLoader<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn load(&self, entry_module: &Path) -> Result<T> {
        let content = tokio::fs::read(entry_module)
            .await
            .map_err(|e| QuarryError::Load {
                path: entry_module.to_path_buf(),
                message: e.to_string(),
            })?;

        serde_json::from_slice(&content).map_err(|e| QuarryError::Load {
            path: entry_module.to_path_buf(),
            message: format!("invalid module document: {}", e),
        })
    }
}

type Factory<T> = Arc<dyn Fn(&Path) -> Result<T> + Send + Sync>;

/// Loads projects from factories registered under their directory name.
///
/// The directory holding the entry module selects the factory, so a project
/// installed as `<cache>/asserter/index.json` is built by the factory
/// registered as `asserter`.
pub struct FactoryModuleLoader<T> {
    factories: HashMap<String, Factory<T>>,
}

impl<T> FactoryModuleLoader<T> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory for a project directory name.
    pub fn register<F>(mut self, project: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Path) -> Result<T> + Send + Sync + 'static,
    {
        self.factories.insert(project.into(), Arc::new(factory));
        self
    }

    pub fn is_registered(&self, project: &str) -> bool {
        self.factories.contains_key(project)
    }
}

impl<T> Default for FactoryModuleLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + 'static> ModuleLoader<T> for FactoryModuleLoader<T> {
    async fn load(&self, entry_module: &Path) -> Result<T> {
        let project = entry_module
            .parent()
            .and_then(|dir| dir.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !entry_module.is_file() {
            return Err(QuarryError::Load {
                path: entry_module.to_path_buf(),
                message: "entry module does not exist".to_string(),
            });
        }

        let factory = self
            .factories
            .get(&project)
            .ok_or_else(|| QuarryError::Load {
                path: entry_module.to_path_buf(),
                message: format!("no factory registered for '{}'", project),
            })?;

        factory(entry_module)
    }
}
