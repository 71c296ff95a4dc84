//! Checksum manifest for the downloads directory.
//!
//! The manifest lists one line per artifact in the format used by
//! `sha256sum`: `<64-hex-digest>  <filename>\n`. Entries follow the
//! directory-listing order; nothing is sorted.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::consts::CHECKSUMS_FILE;
use crate::util::hash::{ContentHash, HashError, hash_file};

/// Errors that can occur while writing the checksum manifest.
#[derive(Debug, Error)]
pub enum ChecksumError {
  #[error("failed to list '{path}': {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Hash(#[from] HashError),

  #[error("failed to write '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("hashing task failed: {0}")]
  Task(String),
}

/// One artifact and its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
  pub file_name: String,
  pub hash: ContentHash,
}

/// Ordered list of artifact digests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
  entries: Vec<ChecksumEntry>,
}

impl ChecksumManifest {
  pub fn new(entries: Vec<ChecksumEntry>) -> Self {
    Self { entries }
  }

  pub fn entries(&self) -> &[ChecksumEntry] {
    &self.entries
  }

  /// Digest of the artifact named `file_name`, if it was present.
  pub fn get(&self, file_name: &str) -> Option<&ContentHash> {
    self
      .entries
      .iter()
      .find(|entry| entry.file_name == file_name)
      .map(|entry| &entry.hash)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl fmt::Display for ChecksumManifest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for entry in &self.entries {
      writeln!(f, "{}  {}", entry.hash, entry.file_name)?;
    }
    Ok(())
  }
}

/// Hash every regular file in `dir`, in listing order.
///
/// The manifest file itself is skipped so a leftover copy from an earlier run
/// never lists itself.
pub async fn collect_checksums(dir: &Path) -> Result<ChecksumManifest, ChecksumError> {
  let read_dir_err = |source: std::io::Error| ChecksumError::ReadDir {
    path: dir.to_path_buf(),
    source,
  };

  let mut listing = fs::read_dir(dir).await.map_err(read_dir_err)?;
  let mut entries = Vec::new();

  while let Some(entry) = listing.next_entry().await.map_err(read_dir_err)? {
    let file_name = entry.file_name().to_string_lossy().into_owned();
    if file_name == CHECKSUMS_FILE {
      continue;
    }
    let file_type = entry.file_type().await.map_err(read_dir_err)?;
    if !file_type.is_file() {
      debug!(name = %file_name, "skipping non-file entry");
      continue;
    }

    let path = entry.path();
    let hash = tokio::task::spawn_blocking(move || hash_file(&path))
      .await
      .map_err(|e| ChecksumError::Task(e.to_string()))??;

    debug!(name = %file_name, hash = %hash, "hashed artifact");
    entries.push(ChecksumEntry { file_name, hash });
  }

  Ok(ChecksumManifest::new(entries))
}

/// Hash the contents of `dir` and write the manifest to `dir/sha256_checksums.txt`.
pub async fn write_checksums(dir: &Path) -> Result<ChecksumManifest, ChecksumError> {
  let manifest = collect_checksums(dir).await?;
  let path = dir.join(CHECKSUMS_FILE);

  fs::write(&path, manifest.to_string())
    .await
    .map_err(|source| ChecksumError::Write {
      path: path.clone(),
      source,
    })?;

  info!(path = %path.display(), entries = manifest.len(), "written checksums");
  Ok(manifest)
}
