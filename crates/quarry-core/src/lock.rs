//! Per-project advisory lock around installation.
//!
//! Two processes installing the same project into the same cache would race
//! on the destination directory. The installer holds an exclusive lock on
//! `<cache_root>/.locks/<name>.lock` for the whole install.

use crate::config::RegistryConfig;
use crate::error::{QuarryError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Held exclusive lock on a project; released on drop.
#[derive(Debug)]
pub struct ProjectLock {
    file: File,
    path: PathBuf,
}

impl ProjectLock {
    /// Path of the lock file guarding `name` under `cache_root`.
    pub fn lock_path(cache_root: &Path, name: &str) -> PathBuf {
        // Scoped names such as `@scope/pkg` must map to a single file.
        let file_name = format!("{}.lock", name.replace(['/', '\\'], "__"));
        cache_root.join(RegistryConfig::LOCKS_DIR_NAME).join(file_name)
    }

    /// Block (on the blocking pool) until the lock for `name` is acquired.
    pub async fn acquire(cache_root: &Path, name: &str) -> Result<Self> {
        let path = Self::lock_path(cache_root, name);

        tokio::task::spawn_blocking(move || Self::acquire_blocking(path))
            .await
            .map_err(|e| QuarryError::Io {
                message: format!("Lock task failed: {}", e),
                path: None,
                source: None,
            })?
    }

    fn acquire_blocking(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| QuarryError::Io {
                message: format!("Failed to create locks directory: {}", e),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| QuarryError::io_with_path(e, &path))?;

        FileExt::lock_exclusive(&file).map_err(|e| QuarryError::io_with_path(e, &path))?;
        debug!("Acquired install lock {}", path.display());

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release install lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_flattens_scopes() {
        let path = ProjectLock::lock_path(Path::new("/cache"), "@scope/pkg");
        assert_eq!(path, PathBuf::from("/cache/.locks/@scope__pkg.lock"));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let lock = ProjectLock::acquire(temp_dir.path(), "asserter").await.unwrap();
        assert!(lock.path().exists());

        let other = File::open(lock.path()).unwrap();
        assert!(FileExt::try_lock_exclusive(&other).is_err());

        drop(lock);
        assert!(FileExt::try_lock_exclusive(&other).is_ok());
        FileExt::unlock(&other).unwrap();
    }

    #[tokio::test]
    async fn test_reacquire_after_release() {
        let temp_dir = TempDir::new().unwrap();
        let first = ProjectLock::acquire(temp_dir.path(), "asserter").await.unwrap();
        drop(first);
        let second = ProjectLock::acquire(temp_dir.path(), "asserter").await;
        assert!(second.is_ok());
    }
}
