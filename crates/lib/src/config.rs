//! Run-wide release configuration.
//!
//! A [`ReleaseConfig`] is built once at startup and shared read-only (behind an
//! `Arc`) with every stage of the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::consts::{CHECKSUMS_FILE, DIST_DIR, DOWNLOADS_DIR};

/// Default nfpm image version.
pub const DEFAULT_NFPM_VERSION: &str = "1.10.3";

/// Default release version when none is supplied.
pub const DEFAULT_VERSION: &str = "0.0.0";

/// Default commit URL when none is supplied.
pub const DEFAULT_COMMIT_URL: &str = "https://github.com/owner/project/commit/hash";

/// Authentication token for git remotes.
///
/// Formatting never reveals the secret; call [`AuthToken::expose`] where the
/// raw value is actually needed.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
  pub fn new(token: impl Into<String>) -> Self {
    Self(token.into())
  }

  /// Returns the raw token.
  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for AuthToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("AuthToken(***)")
  }
}

impl fmt::Display for AuthToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("***")
  }
}

/// External programs invoked by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
  pub go: PathBuf,
  pub docker: PathBuf,
  pub git: PathBuf,
}

impl Default for Tools {
  fn default() -> Self {
    Self {
      go: PathBuf::from("go"),
      docker: PathBuf::from("docker"),
      git: PathBuf::from("git"),
    }
  }
}

/// Upper bounds for operations that could otherwise hang forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
  /// Applies to every local subprocess (compiler, container runtime, git add/commit).
  pub subprocess: Duration,
  /// Applies to clone and push.
  pub network: Duration,
}

impl Default for Timeouts {
  fn default() -> Self {
    Self {
      subprocess: Duration::from_secs(30 * 60),
      network: Duration::from_secs(10 * 60),
    }
  }
}

/// Immutable parameters for one release run.
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
  /// Version embedded in binaries, packages and manifests (e.g. `1.2.3`).
  pub version: String,
  /// Build date embedded in binaries.
  pub date: String,
  /// URL of the commit being released.
  pub commit_url: String,
  /// Tag of the nfpm image, without the leading `v`.
  pub nfpm_version: String,
  /// Required for publishing, unused while preparing.
  pub token: Option<AuthToken>,
  /// Root of the project being released.
  pub project_dir: PathBuf,
  pub tools: Tools,
  pub timeouts: Timeouts,
}

impl ReleaseConfig {
  /// Create a configuration with defaults for everything but the version and date.
  pub fn new(version: impl Into<String>, date: impl Into<String>, project_dir: impl Into<PathBuf>) -> Self {
    Self {
      version: version.into(),
      date: date.into(),
      commit_url: DEFAULT_COMMIT_URL.to_string(),
      nfpm_version: DEFAULT_NFPM_VERSION.to_string(),
      token: None,
      project_dir: project_dir.into(),
      tools: Tools::default(),
      timeouts: Timeouts::default(),
    }
  }

  /// `<project>/dist`
  pub fn dist_dir(&self) -> PathBuf {
    self.project_dir.join(DIST_DIR)
  }

  /// `<project>/dist/github-downloads`
  pub fn downloads_dir(&self) -> PathBuf {
    self.dist_dir().join(DOWNLOADS_DIR)
  }

  /// `<project>/dist/github-downloads/sha256_checksums.txt`
  pub fn checksums_path(&self) -> PathBuf {
    self.downloads_dir().join(CHECKSUMS_FILE)
  }

  /// Resolve a path relative to the project directory.
  pub fn project_path(&self, relative: impl AsRef<Path>) -> PathBuf {
    self.project_dir.join(relative)
  }

  /// `nfpm` image reference including its tag.
  pub fn nfpm_image(&self) -> String {
    format!("{}:v{}", crate::consts::NFPM_IMAGE, self.nfpm_version)
  }
}
