//! The two top-level release stages.
//!
//! - [`prepare_release`]: build matrix, then checksums, then manifests.
//! - [`publish_release`]: push every rendered manifest to its channel.
//!
//! Each stage is all-or-nothing: any failure surfaces as a [`ReleaseError`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::fs;
use tracing::{Instrument, info, info_span};

use crate::channel::PublishChannel;
use crate::checksum::{ChecksumError, ChecksumManifest, write_checksums};
use crate::config::ReleaseConfig;
use crate::matrix::{BuildError, TargetArtifacts, build_matrix};
use crate::platform::BuildTarget;
use crate::publish::{ChannelError, publish_all};
use crate::render::{RenderError, render_all};

/// Errors that abort a release stage.
#[derive(Debug, Error)]
pub enum ReleaseError {
  #[error("failed to reset output directory '{path}': {source}")]
  ResetDist {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("{} build target(s) failed: {}", .0.len(), join_errors(.0))]
  Targets(Vec<BuildError>),

  #[error(transparent)]
  Checksum(#[from] ChecksumError),

  #[error(transparent)]
  Render(#[from] RenderError),

  #[error("publishing requires an auth token")]
  MissingToken,

  #[error("{} channel(s) failed to publish: {}", .0.len(), join_errors(.0))]
  Channels(Vec<ChannelError>),
}

fn join_errors<'a, E: std::fmt::Display + 'a>(errors: impl IntoIterator<Item = &'a E>) -> String {
  errors.into_iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// What a successful [`prepare_release`] produced.
#[derive(Debug)]
pub struct PrepareOutcome {
  pub artifacts: Vec<TargetArtifacts>,
  pub checksums: ChecksumManifest,
  pub manifests: Vec<PathBuf>,
}

/// Remove `dist/` and recreate the downloads directory.
async fn reset_dist(config: &ReleaseConfig) -> Result<(), ReleaseError> {
  let reset_err = |path: &Path| {
    let path = path.to_path_buf();
    move |source: io::Error| ReleaseError::ResetDist { path, source }
  };

  let dist = config.dist_dir();
  match fs::remove_dir_all(&dist).await {
    Ok(()) => info!(path = %dist.display(), "removed output directory"),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(reset_err(&dist)(e)),
  }

  let downloads = config.downloads_dir();
  fs::create_dir_all(&downloads).await.map_err(reset_err(&downloads))?;
  info!(path = %downloads.display(), "created downloads directory");
  Ok(())
}

/// Build, checksum and render a release.
///
/// Stages are strictly ordered: checksums only start once every target has
/// finished, and rendering only starts once the checksum manifest is written.
pub async fn prepare_release(
  config: Arc<ReleaseConfig>,
  channels: &[PublishChannel],
) -> Result<PrepareOutcome, ReleaseError> {
  let span = info_span!("prepare", version = %config.version);
  async {
    reset_dist(&config).await?;

    let artifacts = build_matrix(config.clone(), &BuildTarget::matrix())
      .await
      .map_err(ReleaseError::Targets)?;

    let checksums = write_checksums(&config.downloads_dir()).await?;
    let manifests = render_all(&config, channels, &checksums).await?;

    Ok(PrepareOutcome {
      artifacts,
      checksums,
      manifests,
    })
  }
  .instrument(span)
  .await
}

/// Publish rendered manifests to every channel.
pub async fn publish_release(config: Arc<ReleaseConfig>, channels: Vec<PublishChannel>) -> Result<(), ReleaseError> {
  let token = config.token.clone().ok_or(ReleaseError::MissingToken)?;
  let span = info_span!("publish", version = %config.version);
  publish_all(config, channels, token)
    .instrument(span)
    .await
    .map_err(ReleaseError::Channels)
}
