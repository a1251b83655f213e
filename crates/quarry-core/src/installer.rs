//! Project installation from the remote registry.
//!
//! Handles downloading, verifying, extracting and setting up a project, then
//! loads it.

use crate::archive::{extract_entries_async, write_entries};
use crate::config::QuarryConfig;
use crate::error::{QuarryError, Result};
use crate::integrity::verify_integrity_async;
use crate::loader::ModuleLoader;
use crate::lock::ProjectLock;
use crate::naming::{remove_version_and_extension, tarball_file_name};
use crate::registry::RegistryClient;
use crate::runner::{install_dependencies, CommandRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tarball written to disk by the download step.
#[derive(Debug, Clone)]
struct DownloadedTarball {
    file_name: String,
    destination: PathBuf,
}

impl DownloadedTarball {
    fn path(&self) -> PathBuf {
        self.destination.join(&self.file_name)
    }
}

/// Handles project installation.
pub struct ProjectInstaller<T: Send + 'static> {
    config: QuarryConfig,
    registry: RegistryClient,
    loader: Arc<dyn ModuleLoader<T>>,
    runner: Arc<dyn CommandRunner>,
}

impl<T: Send + 'static> ProjectInstaller<T> {
    pub fn new(
        config: QuarryConfig,
        registry: RegistryClient,
        loader: Arc<dyn ModuleLoader<T>>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            registry,
            loader,
            runner,
        }
    }

    /// Install `name` from the registry into the cache and load it.
    ///
    /// A failed integrity check leaves the downloaded tarball in place. A
    /// failure to delete the tarball after a successful load is only logged.
    pub async fn install(&self, registry_url: &str, cache_root: &Path, name: &str) -> Result<T> {
        info!("Starting installation of {}", name);
        let _lock = ProjectLock::acquire(cache_root, name).await?;

        // Step 1: Download and verify
        let tarball = self.download(registry_url, cache_root, name).await?;

        // Step 2: Extract
        self.extract(&tarball).await?;

        // Step 3: Install dependencies
        let project_dir = cache_root.join(name);
        install_dependencies(self.runner.as_ref(), &self.config, name, &project_dir).await?;

        // Step 4: Load
        let entry_module = tarball.destination.join(&self.config.entry_module);
        let project = self.loader.load(&entry_module).await?;

        // Step 5: Cleanup
        self.remove_tarball(&tarball);

        info!("Installation of {} completed successfully", name);
        Ok(project)
    }

    async fn download(
        &self,
        registry_url: &str,
        cache_root: &Path,
        name: &str,
    ) -> Result<DownloadedTarball> {
        let metadata = self.registry.fetch_metadata(registry_url, name).await?;

        let file_name = tarball_file_name(&metadata.tarball_url).to_string();
        let directory_name = remove_version_and_extension(&file_name);
        if directory_name.is_empty() {
            return Err(QuarryError::registry(
                name,
                &metadata.tarball_url,
                format!("cannot derive a project directory from '{}'", file_name),
            ));
        }

        let tarball = DownloadedTarball {
            file_name,
            destination: cache_root.join(directory_name),
        };

        let bytes = self
            .registry
            .fetch_tarball(name, &metadata.tarball_url)
            .await?;

        std::fs::create_dir_all(&tarball.destination).map_err(|e| QuarryError::Io {
            message: format!("Failed to create project directory: {}", e),
            path: Some(tarball.destination.clone()),
            source: Some(e),
        })?;

        let tarball_path = tarball.path();
        std::fs::write(&tarball_path, &bytes).map_err(|e| QuarryError::Io {
            message: format!("Failed to write tarball: {}", e),
            path: Some(tarball_path.clone()),
            source: Some(e),
        })?;
        info!("Project {} has been downloaded", name);

        verify_integrity_async(metadata.integrity, tarball_path, name.to_string()).await?;

        Ok(tarball)
    }

    async fn extract(&self, tarball: &DownloadedTarball) -> Result<()> {
        let tarball_path = tarball.path();
        let bytes = std::fs::read(&tarball_path).map_err(|e| QuarryError::Io {
            message: format!("Failed to read tarball: {}", e),
            path: Some(tarball_path.clone()),
            source: Some(e),
        })?;

        let entries = extract_entries_async(bytes).await?;
        let written = write_entries(
            &entries,
            &tarball.destination,
            &self.config.archive_root_prefix,
        )?;

        debug!(
            "Extracted {} files into {}",
            written.len(),
            tarball.destination.display()
        );
        Ok(())
    }

    fn remove_tarball(&self, tarball: &DownloadedTarball) {
        let tarball_path = tarball.path();
        match std::fs::remove_file(&tarball_path) {
            Ok(()) => info!("{} was deleted", tarball.file_name),
            Err(e) => warn!(
                "Failed to delete tarball {}: {}",
                tarball_path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::JsonModuleLoader;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct NoopRunner;

    #[async_trait]
    impl CommandRunner for NoopRunner {
        async fn run(&self, _cwd: &Path, _program: &str, _args: &[String]) -> Result<i32> {
            Ok(0)
        }
    }

    fn installer() -> ProjectInstaller<serde_json::Value> {
        ProjectInstaller::new(
            QuarryConfig::default(),
            RegistryClient::new().unwrap(),
            Arc::new(JsonModuleLoader::<serde_json::Value>::new()),
            Arc::new(NoopRunner),
        )
    }

    #[tokio::test]
    async fn test_unversioned_tarball_name_is_rejected() {
        let server = MockServer::start().await;
        let cache = TempDir::new().unwrap();
        let tarball_url = format!("{}/tarballs/pkg.tgz", server.uri());
        Mock::given(method("GET"))
            .and(path("/pkg/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "dist": { "tarball": tarball_url.clone(), "integrity": "sha512-abc" }
            })))
            .mount(&server)
            .await;

        let err = installer()
            .install(&server.uri(), cache.path(), "pkg")
            .await
            .unwrap_err();

        match &err {
            QuarryError::Registry { project, url, .. } => {
                assert_eq!(project, "pkg");
                assert_eq!(url, &tarball_url);
            }
            other => panic!("expected a registry error, got {other:?}"),
        }
        assert!(err
            .to_string()
            .contains("cannot derive a project directory from 'pkg.tgz'"));

        // Only the lock directory may exist; nothing is written to the cache root.
        let names: Vec<_> = std::fs::read_dir(cache.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(".locks")]);
    }

    #[test]
    fn test_downloaded_tarball_path() {
        let tarball = DownloadedTarball {
            file_name: "ddd-asserter-0.0.2-latest.tgz".to_string(),
            destination: PathBuf::from("/cache/ddd-asserter"),
        };
        assert_eq!(
            tarball.path(),
            PathBuf::from("/cache/ddd-asserter/ddd-asserter-0.0.2-latest.tgz")
        );
    }
}
