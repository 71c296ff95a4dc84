//! Distribution channels.
//!
//! A channel is one external package index (a Homebrew tap, a Scoop bucket)
//! that receives a rendered manifest for every release.

use std::path::PathBuf;

use crate::config::ReleaseConfig;
use crate::consts::PROJECT_NAME;
use crate::platform::BuildTarget;
use crate::platform::arch::Arch;
use crate::platform::os::Os;

/// One publish destination and the files that feed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishChannel {
  /// Short name used in logs, e.g. `brew`.
  pub name: String,
  /// Remote repository cloned and pushed to.
  pub remote_url: String,
  /// Template path, relative to the project directory.
  pub template: PathBuf,
  /// Rendered manifest path, relative to the dist directory.
  pub rendered: PathBuf,
  /// Manifest path inside the remote repository.
  pub repo_path: PathBuf,
  /// Target whose archive digest is substituted for `${HASH}`.
  pub artifact: BuildTarget,
}

impl PublishChannel {
  /// Homebrew tap shipping the darwin archive.
  pub fn homebrew() -> Self {
    Self {
      name: "brew".to_string(),
      remote_url: "https://github.com/brad-jones/homebrew-tap.git".to_string(),
      template: PathBuf::from("brew.rb"),
      rendered: PathBuf::from("homebrew-tap").join(format!("{}.rb", PROJECT_NAME)),
      repo_path: PathBuf::from("Formula").join(format!("{}.rb", PROJECT_NAME)),
      artifact: BuildTarget::new(Os::MacOs, Arch::Amd64),
    }
  }

  /// Scoop bucket shipping the windows archive.
  pub fn scoop() -> Self {
    Self {
      name: "scoop".to_string(),
      remote_url: "https://github.com/brad-jones/scoop-bucket.git".to_string(),
      template: PathBuf::from("scoop.json"),
      rendered: PathBuf::from("scoop-bucket").join(format!("{}.json", PROJECT_NAME)),
      repo_path: PathBuf::from(format!("{}.json", PROJECT_NAME)),
      artifact: BuildTarget::new(Os::Windows, Arch::Amd64),
    }
  }

  /// Every channel a release is published to.
  pub fn all() -> Vec<Self> {
    vec![Self::homebrew(), Self::scoop()]
  }

  /// Archive file whose digest this channel embeds.
  pub fn artifact_file_name(&self) -> String {
    self.artifact.archive_file_name()
  }

  pub fn template_path(&self, config: &ReleaseConfig) -> PathBuf {
    config.project_path(&self.template)
  }

  pub fn rendered_path(&self, config: &ReleaseConfig) -> PathBuf {
    config.dist_dir().join(&self.rendered)
  }

  /// Local clone directory, next to the rendered manifest.
  pub fn clone_dir(&self, config: &ReleaseConfig) -> PathBuf {
    let rendered = self.rendered_path(config);
    rendered
      .parent()
      .map(|parent| parent.join("repo"))
      .unwrap_or_else(|| config.dist_dir().join(&self.name).join("repo"))
  }
}
