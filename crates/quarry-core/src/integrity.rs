//! Integrity verification for downloaded tarballs.
//!
//! Registries publish an integrity descriptor of the form
//! `<algorithm>-<base64 digest>` (Subresource Integrity style). The file on
//! disk is hashed with the named algorithm and compared to the published
//! digest.

use crate::error::{QuarryError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Chunk size for reading files.
const CHUNK_SIZE: usize = 64 * 1024;

/// Hash algorithms accepted in integrity descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(QuarryError::InvalidIntegrity {
                descriptor: s.to_string(),
                message: format!("unsupported hash algorithm '{}'", other),
            }),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed `<algorithm>-<base64 digest>` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityDescriptor {
    pub algorithm: HashAlgorithm,
    /// Expected digest, base64 encoded.
    pub digest: String,
}

impl IntegrityDescriptor {
    /// Parse a descriptor, splitting on the first `-`.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let (algorithm, digest) =
            descriptor
                .split_once('-')
                .ok_or_else(|| QuarryError::InvalidIntegrity {
                    descriptor: descriptor.to_string(),
                    message: "expected '<algorithm>-<digest>'".to_string(),
                })?;

        if digest.is_empty() {
            return Err(QuarryError::InvalidIntegrity {
                descriptor: descriptor.to_string(),
                message: "digest is empty".to_string(),
            });
        }

        let algorithm = algorithm.parse::<HashAlgorithm>().map_err(|_| {
            QuarryError::InvalidIntegrity {
                descriptor: descriptor.to_string(),
                message: format!("unsupported hash algorithm '{}'", algorithm),
            }
        })?;

        Ok(Self {
            algorithm,
            digest: digest.to_string(),
        })
    }
}

impl fmt::Display for IntegrityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.algorithm, self.digest)
    }
}

/// Compute the base64 digest of a file under the given algorithm.
pub fn compute_file_digest(path: impl AsRef<Path>, algorithm: HashAlgorithm) -> Result<String> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| QuarryError::io_with_path(e, path))?;

    let raw = match algorithm {
        HashAlgorithm::Sha1 => digest_reader::<Sha1>(file, path)?,
        HashAlgorithm::Sha256 => digest_reader::<Sha256>(file, path)?,
        HashAlgorithm::Sha384 => digest_reader::<Sha384>(file, path)?,
        HashAlgorithm::Sha512 => digest_reader::<Sha512>(file, path)?,
    };

    Ok(STANDARD.encode(raw))
}

fn digest_reader<D: Digest>(mut reader: impl Read, path: &Path) -> Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| QuarryError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize().to_vec())
}

/// Verify that the file at `file_path` matches the `expected` descriptor.
///
/// Fails with [`QuarryError::IntegrityMismatch`] naming `project` when the
/// digests differ.
pub fn verify_integrity(expected: &str, file_path: impl AsRef<Path>, project: &str) -> Result<()> {
    let file_path = file_path.as_ref();
    let descriptor = IntegrityDescriptor::parse(expected)?;
    let actual = compute_file_digest(file_path, descriptor.algorithm)?;

    if actual != descriptor.digest {
        return Err(QuarryError::IntegrityMismatch {
            project: project.to_string(),
            expected: descriptor.digest,
            actual,
        });
    }

    debug!(
        "Verified {} integrity of {}",
        descriptor.algorithm,
        file_path.display()
    );
    Ok(())
}

/// Run [`verify_integrity`] on the blocking pool.
pub async fn verify_integrity_async(
    expected: String,
    file_path: PathBuf,
    project: String,
) -> Result<()> {
    tokio::task::spawn_blocking(move || verify_integrity(&expected, &file_path, &project))
        .await
        .map_err(|e| QuarryError::Io {
            message: format!("Integrity task failed: {}", e),
            path: None,
            source: None,
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FIXTURE: &[u8] = b"quarry integrity fixture\n";
    const FIXTURE_SHA1: &str = "x3+sIBU1CZXlhHB5w/OAHwGl7tw=";
    const FIXTURE_SHA256: &str = "TYjCHf84jooF4XK8d+Ep/REbGdKBVfsfUR+O199QCC4=";
    const FIXTURE_SHA384: &str =
        "/10N+0cA6QhGDwxjedBxauYyL/l+16ve6CO3VuKZ1NmN/WsZwFDuN6IP/3AT1qHA";
    const FIXTURE_SHA512: &str =
        "javvXZj1qjm42Vh9eYBDZlkOqc2iVhWRgwXkaqUbXrlb4REovVxZa/a/gR3/qThdklj5D4RCVB3GYQPAFJf6jg==";

    fn fixture_file() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test-file-checksum.txt");
        std::fs::write(&path, FIXTURE).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_compute_digests() {
        let (_dir, path) = fixture_file();
        assert_eq!(
            compute_file_digest(&path, HashAlgorithm::Sha1).unwrap(),
            FIXTURE_SHA1
        );
        assert_eq!(
            compute_file_digest(&path, HashAlgorithm::Sha256).unwrap(),
            FIXTURE_SHA256
        );
        assert_eq!(
            compute_file_digest(&path, HashAlgorithm::Sha384).unwrap(),
            FIXTURE_SHA384
        );
        assert_eq!(
            compute_file_digest(&path, HashAlgorithm::Sha512).unwrap(),
            FIXTURE_SHA512
        );
    }

    #[test]
    fn test_verify_matching_file() {
        let (_dir, path) = fixture_file();
        let descriptor = format!("sha512-{}", FIXTURE_SHA512);
        assert!(verify_integrity(&descriptor, &path, "test-project").is_ok());
    }

    #[test]
    fn test_verify_mismatched_file() {
        let (_dir, path) = fixture_file();
        let err = verify_integrity("sha512-AZERTYUIOP", &path, "test-project").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not verify test-project package integrity"
        );
    }

    #[test]
    fn test_parse_splits_on_first_dash() {
        let descriptor = IntegrityDescriptor::parse("SHA1-ab-cd").unwrap();
        assert_eq!(descriptor.algorithm, HashAlgorithm::Sha1);
        assert_eq!(descriptor.digest, "ab-cd");
        assert_eq!(descriptor.to_string(), "sha1-ab-cd");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            IntegrityDescriptor::parse("sha512"),
            Err(QuarryError::InvalidIntegrity { .. })
        ));
        assert!(matches!(
            IntegrityDescriptor::parse("sha512-"),
            Err(QuarryError::InvalidIntegrity { .. })
        ));
        assert!(matches!(
            IntegrityDescriptor::parse("md5-abc"),
            Err(QuarryError::InvalidIntegrity { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = compute_file_digest("/nonexistent/quarry/file", HashAlgorithm::Sha256)
            .unwrap_err();
        assert!(matches!(err, QuarryError::Io { .. }));
    }

    #[tokio::test]
    async fn test_verify_async() {
        let (_dir, path) = fixture_file();
        let descriptor = format!("sha256-{}", FIXTURE_SHA256);
        verify_integrity_async(descriptor, path, "test-project".to_string())
            .await
            .unwrap();
    }
}
