//! Host path helpers for container bind mounts.

use std::path::Path;

/// Translate a host path into the POSIX form used inside a container.
///
/// A leading drive prefix (`C:` followed by a backslash) is dropped and every
/// backslash becomes a forward slash. POSIX paths pass through unchanged.
pub fn container_path(host: &str) -> String {
  let bytes = host.as_bytes();
  let without_drive = if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'\\' {
    &host[2..]
  } else {
    host
  };
  without_drive.replace('\\', "/")
}

/// [`container_path`] for a [`Path`].
pub fn container_path_of(host: &Path) -> String {
  container_path(&host.to_string_lossy())
}
