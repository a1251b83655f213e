//! Tarball extraction into in-memory entries.
//!
//! Extraction is archive-faithful: entry paths are reported exactly as stored.
//! Prefix stripping and path sanitizing happen in [`write_entries`].

use crate::error::{QuarryError, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A regular file read out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Archive-relative path, `/` separated.
    pub path: String,
    /// File content.
    pub content: Vec<u8>,
}

/// Read every regular file of a tar archive, in archive order.
///
/// Gzip-compressed input is detected by its magic bytes. Any malformed header
/// or truncated stream fails the whole extraction.
pub fn extract_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let entries = if bytes.starts_with(&GZIP_MAGIC) {
        read_entries(GzDecoder::new(bytes))?
    } else {
        read_entries(bytes)?
    };

    debug!("Extracted {} entries from archive", entries.len());
    Ok(entries)
}

/// Run [`extract_entries`] on the blocking pool.
pub async fn extract_entries_async(bytes: Vec<u8>) -> Result<Vec<ArchiveEntry>> {
    tokio::task::spawn_blocking(move || extract_entries(&bytes))
        .await
        .map_err(|e| QuarryError::Archive {
            message: format!("Extraction task failed: {}", e),
        })?
}

fn read_entries<R: Read>(reader: R) -> Result<Vec<ArchiveEntry>> {
    let mut archive = tar::Archive::new(reader);
    let mut entries = Vec::new();

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;

        // Directories, links and pax headers carry no file content.
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = match std::str::from_utf8(&entry.path_bytes()) {
            Ok(path) => path.to_string(),
            Err(_) => {
                return Err(QuarryError::Archive {
                    message: format!(
                        "Entry path is not valid UTF-8: {}",
                        String::from_utf8_lossy(&entry.path_bytes())
                    ),
                })
            }
        };

        // The header size is untrusted until the data has actually been read.
        let expected_size = entry.size();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).map_err(archive_error)?;
        if content.len() as u64 != expected_size {
            return Err(QuarryError::Archive {
                message: format!(
                    "Entry {} truncated: header declares {} bytes, read {}",
                    path,
                    expected_size,
                    content.len()
                ),
            });
        }

        entries.push(ArchiveEntry { path, content });
    }

    Ok(entries)
}

fn archive_error(err: std::io::Error) -> QuarryError {
    QuarryError::Archive {
        message: err.to_string(),
    }
}

/// Write entries under `destination`, stripping `strip_prefix` from each path.
///
/// Parent directories are created as needed. Paths that are absolute or climb
/// out of `destination` are rejected. Returns the written file paths.
pub fn write_entries(
    entries: &[ArchiveEntry],
    destination: &Path,
    strip_prefix: &str,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(entries.len());

    for entry in entries {
        let relative = entry
            .path
            .strip_prefix(strip_prefix)
            .unwrap_or(&entry.path);
        let relative = sanitize_relative_path(relative)?;
        let outpath = destination.join(&relative);

        if let Some(parent) = outpath.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| QuarryError::Io {
                    message: format!("Failed to create parent directory: {}", e),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        std::fs::write(&outpath, &entry.content).map_err(|e| QuarryError::Io {
            message: format!("Failed to write extracted file: {}", e),
            path: Some(outpath.clone()),
            source: Some(e),
        })?;

        written.push(outpath);
    }

    Ok(written)
}

fn sanitize_relative_path(path: &str) -> Result<PathBuf> {
    let mut sanitized = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => sanitized.push(part),
            Component::CurDir => {}
            _ => {
                return Err(QuarryError::Archive {
                    message: format!("Entry path escapes destination: {}", path),
                })
            }
        }
    }

    if sanitized.as_os_str().is_empty() {
        return Err(QuarryError::Archive {
            message: format!("Entry path is empty after stripping: '{}'", path),
        });
    }

    Ok(sanitized)
}
