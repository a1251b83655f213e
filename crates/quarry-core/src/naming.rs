//! Tarball file-name rules.
//!
//! The destination directory of an install is derived from the tarball file
//! name, so these functions must stay byte-for-byte stable.

use crate::config::RegistryConfig;

const EXTENSION_SEPARATOR: &str = ".";
const VERSION_SEPARATOR: &str = "-";

/// Strip the `-latest` marker, the extension and the version from a tarball
/// file name.
///
/// `ddd-asserter-0.0.2-latest.tgz` becomes `ddd-asserter`. A name without an
/// extension or without a version segment collapses to an empty string.
pub fn remove_version_and_extension(file_name: &str) -> String {
    let without_marker = file_name.replacen(RegistryConfig::LATEST_MARKER, "", 1);
    let without_extension = drop_last_segment(&without_marker, EXTENSION_SEPARATOR);
    drop_last_segment(&without_extension, VERSION_SEPARATOR)
}

/// File name of a tarball: the last `/`-delimited segment of its URL.
pub fn tarball_file_name(tarball_url: &str) -> &str {
    tarball_url.rsplit('/').next().unwrap_or(tarball_url)
}

fn drop_last_segment(value: &str, separator: &str) -> String {
    let mut segments: Vec<&str> = value.split(separator).collect();
    segments.pop();
    segments.join(separator)
}
