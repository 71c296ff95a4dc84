//! Archive creation for one build target.
//!
//! Windows builds are shipped as ZIP, everything else as gzip-compressed tar.
//! Each archive holds the project docs plus the binary under its
//! platform-specific entry name.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::ReleaseConfig;
use crate::consts::ARCHIVE_DOCS;
use crate::platform::{ArchiveFormat, BuildTarget};

use super::compile::binary_path;

/// Errors that can occur while writing an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("archive io error on '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("zip error on '{path}': {source}")]
  Zip {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("archive task failed: {0}")]
  Task(String),
}

/// A file to place in an archive: `(source path, entry name)`.
pub type ArchiveEntry = (PathBuf, String);

/// The four entries of `target`'s archive, in archive order.
pub fn archive_entries(config: &ReleaseConfig, target: &BuildTarget) -> Vec<ArchiveEntry> {
  let mut entries: Vec<ArchiveEntry> = ARCHIVE_DOCS
    .iter()
    .map(|doc| (config.project_path(doc), doc.to_string()))
    .collect();
  entries.push((binary_path(config, target), target.binary_entry_name()));
  entries
}

/// Package `target`'s binary and docs into the downloads directory.
///
/// Encoding is CPU-bound and runs on the blocking pool.
pub async fn create_archive(config: &ReleaseConfig, target: &BuildTarget) -> Result<PathBuf, ArchiveError> {
  let output = config.downloads_dir().join(target.archive_file_name());
  let entries = archive_entries(config, target);
  let format = target.archive_format();

  let dest = output.clone();
  tokio::task::spawn_blocking(move || write_archive(format, &dest, &entries))
    .await
    .map_err(|e| ArchiveError::Task(e.to_string()))??;

  info!(path = %output.display(), "packaged archive");
  Ok(output)
}

/// Write `entries` to `output` in the given format.
pub fn write_archive(format: ArchiveFormat, output: &Path, entries: &[ArchiveEntry]) -> Result<(), ArchiveError> {
  match format {
    ArchiveFormat::TarGz => write_tar_gz(output, entries),
    ArchiveFormat::Zip => write_zip(output, entries),
  }
}

fn write_tar_gz(output: &Path, entries: &[ArchiveEntry]) -> Result<(), ArchiveError> {
  let io_err = |path: &Path| {
    let path = path.to_path_buf();
    move |source: io::Error| ArchiveError::Io { path, source }
  };

  let file = File::create(output).map_err(io_err(output))?;
  let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

  for (source, name) in entries {
    builder.append_path_with_name(source, name).map_err(io_err(source))?;
  }

  let encoder = builder.into_inner().map_err(io_err(output))?;
  encoder.finish().map_err(io_err(output))?;
  Ok(())
}

fn write_zip(output: &Path, entries: &[ArchiveEntry]) -> Result<(), ArchiveError> {
  let zip_err = |source: zip::result::ZipError| ArchiveError::Zip {
    path: output.to_path_buf(),
    source,
  };

  let file = File::create(output).map_err(|source| ArchiveError::Io {
    path: output.to_path_buf(),
    source,
  })?;
  let mut zip = ZipWriter::new(file);

  for (source, name) in entries {
    let mut input = File::open(source).map_err(|e| ArchiveError::Io {
      path: source.clone(),
      source: e,
    })?;
    let options = SimpleFileOptions::default()
      .compression_method(CompressionMethod::Deflated)
      .unix_permissions(unix_mode(&input));

    zip.start_file(name.as_str(), options).map_err(zip_err)?;
    io::copy(&mut input, &mut zip).map_err(|e| ArchiveError::Io {
      path: source.clone(),
      source: e,
    })?;
  }

  zip.finish().map_err(zip_err)?;
  Ok(())
}

/// Permission bits recorded for a zip entry.
#[cfg(unix)]
fn unix_mode(file: &File) -> u32 {
  use std::os::unix::fs::PermissionsExt;
  file.metadata().map(|m| m.permissions().mode() & 0o777).unwrap_or(0o644)
}

#[cfg(not(unix))]
fn unix_mode(_file: &File) -> u32 {
  0o755
}
