//! Toolchain invocation for one build target.

use std::path::PathBuf;

use crate::config::ReleaseConfig;
use crate::consts::DIST_DIR;
use crate::platform::BuildTarget;
use crate::process::Exec;

/// Linker flags injecting the version metadata into the binary.
pub fn ldflags(config: &ReleaseConfig) -> String {
  format!(
    "-X main.versionNo={} -X main.commitUrl={} -X main.date={}",
    config.version, config.commit_url, config.date
  )
}

/// The `go build` invocation for `target`, run from the project directory.
///
/// Cross compilation is driven purely by `GOOS`/`GOARCH`; cgo is disabled so
/// no host C toolchain is involved.
pub fn compile_command(config: &ReleaseConfig, target: &BuildTarget) -> Exec {
  Exec::new(&config.tools.go, config.timeouts.subprocess)
    .arg("build")
    .arg("-ldflags")
    .arg(ldflags(config))
    .arg("-o")
    .arg(format!("./{}/{}", DIST_DIR, target.binary_file_name()))
    .arg(".")
    .env("CGO_ENABLED", "0")
    .env("GOOS", target.os.as_str())
    .env("GOARCH", target.arch.as_str())
    .current_dir(&config.project_dir)
}

/// Where [`compile_command`] leaves the binary.
pub fn binary_path(config: &ReleaseConfig, target: &BuildTarget) -> PathBuf {
  config.dist_dir().join(target.binary_file_name())
}
