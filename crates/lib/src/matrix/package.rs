//! Native package generation (apk, rpm, deb) through a containerized nfpm.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span};

use crate::config::ReleaseConfig;
use crate::consts::{DIST_DIR, DOWNLOADS_DIR};
use crate::platform::paths::container_path_of;
use crate::platform::{BuildTarget, PackageKind};
use crate::process::Exec;

use super::BuildError;

/// `docker pull` for the pinned nfpm image.
pub fn pull_command(config: &ReleaseConfig) -> Exec {
  Exec::new(&config.tools.docker, config.timeouts.network)
    .arg("pull")
    .arg(config.nfpm_image())
    .current_dir(&config.project_dir)
}

/// `docker run` producing one native package of `kind` for `target`.
///
/// The project directory is mounted at its POSIX-translated path and used as
/// the container's working directory so nfpm resolves the same relative paths
/// as the host.
pub fn nfpm_command(config: &ReleaseConfig, target: &BuildTarget, kind: PackageKind) -> Exec {
  let host = config.project_dir.to_string_lossy().into_owned();
  let mount = container_path_of(&config.project_dir);

  Exec::new(&config.tools.docker, config.timeouts.subprocess)
    .arg("run")
    .arg("--rm")
    .arg("-v")
    .arg(format!("{}:{}", host, mount))
    .arg("-w")
    .arg(mount)
    .arg("-e")
    .arg(format!("VERSION={}", config.version))
    .arg(config.nfpm_image())
    .arg("pkg")
    .arg("--target")
    .arg(format!("./{}/{}/{}", DIST_DIR, DOWNLOADS_DIR, target.package_file_name(kind)))
    .current_dir(&config.project_dir)
}

/// Build every native package for `target`.
///
/// Returns immediately for targets without native packages. Otherwise pulls the
/// image once, then runs one container per package kind concurrently. All
/// kinds run to completion; the first failure is returned and the rest logged.
pub async fn build_packages(config: &Arc<ReleaseConfig>, target: &BuildTarget) -> Result<Vec<PathBuf>, BuildError> {
  let kinds = target.package_kinds();
  if kinds.is_empty() {
    return Ok(Vec::new());
  }

  let image = config.nfpm_image();
  pull_command(config)
    .run()
    .instrument(info_span!("nfpm"))
    .await
    .map_err(|source| BuildError::Pull { image, source })?;

  let mut join_set = JoinSet::new();
  for kind in kinds {
    let kind = *kind;
    let exec = nfpm_command(config, target, kind);
    join_set.spawn(async move { (kind, exec.run().await) }.instrument(info_span!("nfpm", kind = %kind)));
  }

  let mut produced = Vec::new();
  let mut first_error = None;
  while let Some(joined) = join_set.join_next().await {
    let failure = match joined {
      Ok((kind, Ok(()))) => {
        let path = config.downloads_dir().join(target.package_file_name(kind));
        info!(path = %path.display(), "packaged {}", kind);
        produced.push(path);
        continue;
      }
      Ok((kind, Err(source))) => BuildError::Package {
        target: *target,
        kind,
        source,
      },
      Err(e) => BuildError::Task {
        target: *target,
        message: e.to_string(),
      },
    };
    error!(error = %failure, "native packaging failed");
    first_error.get_or_insert(failure);
  }

  match first_error {
    Some(err) => Err(err),
    None => {
      produced.sort();
      Ok(produced)
    }
  }
}
