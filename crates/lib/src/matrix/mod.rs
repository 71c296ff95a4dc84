//! Build matrix execution.
//!
//! Every [`BuildTarget`] is compiled, archived and (for linux) packaged on its
//! own task. Within a target, archiving and native packaging run concurrently
//! once the binary exists. No target waits on another; the matrix only
//! completes when every target has finished, and fails if any target failed.

pub mod archive;
pub mod compile;
pub mod package;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span};

use crate::config::ReleaseConfig;
use crate::platform::{BuildTarget, PackageKind};
use crate::process::ProcessError;

use archive::ArchiveError;

/// Errors raised while building a single target.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error("compiling {target} failed: {source}")]
  Compile {
    target: BuildTarget,
    #[source]
    source: ProcessError,
  },

  #[error("archiving {target} failed: {source}")]
  Archive {
    target: BuildTarget,
    #[source]
    source: ArchiveError,
  },

  #[error("pulling image {image} failed: {source}")]
  Pull {
    image: String,
    #[source]
    source: ProcessError,
  },

  #[error("building {kind} package for {target} failed: {source}")]
  Package {
    target: BuildTarget,
    kind: PackageKind,
    #[source]
    source: ProcessError,
  },

  #[error("build task for {target} aborted: {message}")]
  Task { target: BuildTarget, message: String },
}

/// Everything produced for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetArtifacts {
  pub target: BuildTarget,
  pub binary: PathBuf,
  pub archive: PathBuf,
  pub packages: Vec<PathBuf>,
}

/// Compile, archive and package a single target.
pub async fn build_target(config: Arc<ReleaseConfig>, target: BuildTarget) -> Result<TargetArtifacts, BuildError> {
  compile::compile_command(&config, &target)
    .run()
    .instrument(info_span!("go build"))
    .await
    .map_err(|source| BuildError::Compile { target, source })?;

  let binary = compile::binary_path(&config, &target);
  info!(path = %binary.display(), "built binary");

  let archive = async {
    archive::create_archive(&config, &target)
      .await
      .map_err(|source| BuildError::Archive { target, source })
  };
  let packages = package::build_packages(&config, &target);

  match tokio::join!(archive, packages) {
    (Ok(archive), Ok(packages)) => Ok(TargetArtifacts {
      target,
      binary,
      archive,
      packages,
    }),
    (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
    (Err(first), Err(second)) => {
      error!(error = %second, "native packaging failed alongside archiving");
      Err(first)
    }
  }
}

/// Build every target concurrently.
///
/// All targets run to completion. Each failure is logged as it arrives, and
/// the full list of failures is returned if any target failed. Successful
/// results are sorted by target so the output does not depend on completion
/// order.
pub async fn build_matrix(
  config: Arc<ReleaseConfig>,
  targets: &[BuildTarget],
) -> Result<Vec<TargetArtifacts>, Vec<BuildError>> {
  let mut join_set = JoinSet::new();
  let mut task_targets = HashMap::new();

  for target in targets {
    let target = *target;
    let config = config.clone();
    let span = info_span!("build", target = %target);
    let handle = join_set.spawn(build_target(config, target).instrument(span));
    task_targets.insert(handle.id(), target);
  }

  let mut built = Vec::new();
  let mut failures = Vec::new();

  while let Some(joined) = join_set.join_next_with_id().await {
    match joined {
      Ok((_, Ok(artifacts))) => {
        info!(target = %artifacts.target, "target complete");
        built.push(artifacts);
      }
      Ok((_, Err(e))) => {
        error!(error = %e, "target failed");
        failures.push(e);
      }
      Err(e) => {
        let failure = match task_targets.get(&e.id()) {
          Some(target) => BuildError::Task {
            target: *target,
            message: e.to_string(),
          },
          None => {
            error!(error = %e, "unknown build task failed");
            continue;
          }
        };
        error!(error = %failure, "build task panicked");
        failures.push(failure);
      }
    }
  }

  if !failures.is_empty() {
    return Err(failures);
  }

  built.sort_by_key(|a| a.target);
  Ok(built)
}
