//! Error types for Quarry.
//!
//! Every stage of the resolution pipeline reports failures through
//! [`QuarryError`]. The installer surfaces them to its caller, the local
//! resolver and the lookup orchestrator swallow them after logging.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Quarry library.
#[derive(Debug, Error)]
pub enum QuarryError {
    // Registry errors
    #[error("Could not download {project} at url {url}: {message}")]
    Registry {
        project: String,
        url: String,
        message: String,
    },

    // Integrity errors
    #[error("Could not verify {project} package integrity")]
    IntegrityMismatch {
        project: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid integrity descriptor '{descriptor}': {message}")]
    InvalidIntegrity { descriptor: String, message: String },

    // Archive errors
    #[error("Archive error: {message}")]
    Archive { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Module loading errors
    #[error("Failed to load module {path}: {message}")]
    Load { path: PathBuf, message: String },

    // Dependency installation errors
    #[error("Dependency installation failed for {project}: {message}")]
    DependencyInstall { project: String, message: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for Quarry operations.
pub type Result<T> = std::result::Result<T, QuarryError>;

impl From<std::io::Error> for QuarryError {
    fn from(err: std::io::Error) -> Self {
        QuarryError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        QuarryError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl QuarryError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        QuarryError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a registry error for a project and target URL.
    pub fn registry(
        project: impl Into<String>,
        url: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        QuarryError::Registry {
            project: project.into(),
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Short machine-friendly name of the failing stage, used in log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            QuarryError::Registry { .. } => "download",
            QuarryError::IntegrityMismatch { .. } | QuarryError::InvalidIntegrity { .. } => {
                "integrity"
            }
            QuarryError::Archive { .. } => "extract",
            QuarryError::Io { .. } => "filesystem",
            QuarryError::Load { .. } => "load",
            QuarryError::DependencyInstall { .. } => "dependencies",
            QuarryError::Json { .. } | QuarryError::Config { .. } => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = QuarryError::registry("name", "registry/name/latest", "Error: ERROR");
        assert_eq!(
            err.to_string(),
            "Could not download name at url registry/name/latest: Error: ERROR"
        );
    }

    #[test]
    fn test_integrity_error_display() {
        let err = QuarryError::IntegrityMismatch {
            project: "test-project".into(),
            expected: "AZERTYUIOP".into(),
            actual: "abc".into(),
        };
        assert_eq!(
            err.to_string(),
            "Could not verify test-project package integrity"
        );
        assert_eq!(err.stage(), "integrity");
    }

    #[test]
    fn test_io_with_path() {
        let err = QuarryError::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/x",
        );
        match err {
            QuarryError::Io { path, .. } => assert_eq!(path, Some(PathBuf::from("/tmp/x"))),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
