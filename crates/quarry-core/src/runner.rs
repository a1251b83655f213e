//! Subprocess capability used to install project dependencies.

use crate::config::QuarryConfig;
use crate::error::{QuarryError, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, warn};

/// Runs an external command and reports its exit code.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` inside `cwd`.
    ///
    /// A process killed by a signal reports `-1`.
    async fn run(&self, cwd: &Path, program: &str, args: &[String]) -> Result<i32>;
}

/// Runs commands as child processes with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, cwd: &Path, program: &str, args: &[String]) -> Result<i32> {
        debug!("Running {} {:?} in {}", program, args, cwd.display());

        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| QuarryError::Io {
                message: format!("Failed to run {}: {}", program, e),
                path: Some(cwd.to_path_buf()),
                source: Some(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("{} exited with {}: {}", program, output.status, stderr.trim());
        }

        Ok(output.status.code().unwrap_or(-1))
    }
}

/// Install a project's dependencies unless its marker directory exists.
///
/// Returns whether the installer was run. A non-zero exit status fails unless
/// the configuration asks for lenient installs.
pub async fn install_dependencies(
    runner: &dyn CommandRunner,
    config: &QuarryConfig,
    project: &str,
    project_dir: &Path,
) -> Result<bool> {
    if project_dir.join(&config.dependencies_dir).exists() {
        debug!("Dependencies of {} already installed", project);
        return Ok(false);
    }

    if !project_dir.is_dir() {
        return Err(QuarryError::DependencyInstall {
            project: project.to_string(),
            message: format!("project directory {} does not exist", project_dir.display()),
        });
    }

    let code = runner
        .run(project_dir, &config.install_program, &config.install_args)
        .await?;

    if code != 0 {
        let message = format!("{} exited with status {}", config.install_program, code);
        if !config.lenient_dependency_install {
            return Err(QuarryError::DependencyInstall {
                project: project.to_string(),
                message,
            });
        }
        warn!("Ignoring failed dependency install for {}: {}", project, message);
    }

    info!("Project {} has been installed", project);
    Ok(true)
}
