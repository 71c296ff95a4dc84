//! Shared helpers for library integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use releaser_lib::config::ReleaseConfig;
use tempfile::TempDir;

pub const BREW_TEMPLATE: &str = r#"class SshAddWithPass < Formula
    desc "Wrapper around ssh-add that uses expect to unlock the provided key."
    homepage "https://github.com/brad-jones/ssh-add-with-pass"
    url "https://github.com/brad-jones/ssh-add-with-pass/releases/download/v${VERSION}/ssh_add_with_pass_darwin_amd64.tar.gz"
    version "${VERSION}"
    sha256 "${HASH}"

    def install
        bin.install "ssh_add_with_pass"
    end
end
"#;

pub const SCOOP_TEMPLATE: &str = r#"{
    "version": "${VERSION}",
    "url": "https://github.com/brad-jones/ssh-add-with-pass/releases/download/v${VERSION}/ssh_add_with_pass_windows_amd64.zip",
    "hash": "${HASH}",
    "bin": "ssh_add_with_pass.exe"
}
"#;

/// A throwaway project directory with docs and manifest templates.
pub struct TestProject {
  pub temp: TempDir,
}

impl TestProject {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let project = Self { temp };
    project.write("README.md", "# ssh_add_with_pass\n");
    project.write("CHANGELOG.md", "## 2.0.0\n");
    project.write("LICENSE", "MIT\n");
    project.write("brew.rb", BREW_TEMPLATE);
    project.write("scoop.json", SCOOP_TEMPLATE);
    project
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  pub fn write(&self, relative: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Write an executable shell script under `bin/`.
  #[cfg(unix)]
  pub fn script(&self, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = self.write(&format!("bin/{}", name), &format!("#!/bin/sh\n{}", body));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  pub fn config(&self, version: &str) -> ReleaseConfig {
    ReleaseConfig::new(version, "2024-06-01T00:00:00Z", self.path())
  }
}

/// Whether a usable `git` is on PATH.
pub fn git_available() -> bool {
  Command::new("git")
    .arg("--version")
    .output()
    .map(|o| o.status.success())
    .unwrap_or(false)
}

/// Run git in `dir`, panicking on failure, and return trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
  let output = Command::new("git")
    .args(["-c", "user.name=test", "-c", "user.email=test@example.com", "-c", "init.defaultBranch=master"])
    .args(args)
    .current_dir(dir)
    .output()
    .unwrap();
  assert!(
    output.status.success(),
    "git {:?} failed: {}",
    args,
    String::from_utf8_lossy(&output.stderr)
  );
  String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a bare remote seeded with one commit containing `files`.
pub fn bare_remote(root: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
  let seed = root.join(format!("{}-seed", name));
  std::fs::create_dir_all(&seed).unwrap();
  git(&seed, &["init"]);
  std::fs::write(seed.join("README.md"), "seed\n").unwrap();
  for (path, content) in files {
    let file = seed.join(path);
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(file, content).unwrap();
  }
  git(&seed, &["add", "-A"]);
  git(&seed, &["commit", "-m", "seed"]);

  let remote = root.join(format!("{}.git", name));
  git(root, &["clone", "--bare", seed.to_str().unwrap(), remote.to_str().unwrap()]);
  remote
}
