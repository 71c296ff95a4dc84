//! Git operations for publishing.
//!
//! Cloning goes through gix. Staging, committing and pushing use the system
//! `git` binary, since gix cannot push.
//!
//! # Authentication
//!
//! HTTPS remotes authenticate with basic credentials `token:<auth token>`,
//! sent as an `Authorization` extra header. The header is supplied as an
//! in-memory config override for the clone and through `GIT_CONFIG_*`
//! environment variables for the push, so it never lands in the clone's
//! `.git/config`, on a command line, or in the log.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{AuthToken, ReleaseConfig};
use crate::consts::{BOT_EMAIL, BOT_NAME, PROJECT_NAME, PUBLISH_BRANCH, TOKEN_USERNAME};
use crate::process::Exec;

/// Errors raised by the gix clone.
#[derive(Debug, Error)]
pub enum CloneError {
  /// Failed to fetch the repository.
  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// Failed to check out the default branch.
  #[error("failed to checkout '{url}': {source}")]
  Checkout {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

/// `Authorization` header value for `token`.
pub fn authorization_header(token: &AuthToken) -> String {
  let credentials = format!("{}:{}", TOKEN_USERNAME, token.expose());
  format!("Authorization: Basic {}", STANDARD.encode(credentials))
}

/// Clone `url` into `dest`, checking out the remote's default branch.
///
/// Blocking. Setting `should_interrupt` aborts the fetch or checkout at the
/// next point gix checks it.
pub fn clone_repo(url: &str, dest: &Path, token: &AuthToken, should_interrupt: &AtomicBool) -> Result<(), CloneError> {
  info!(url, path = %dest.display(), "cloning repository");

  let header = format!("http.extraHeader={}", authorization_header(token));
  let mut prepared = gix::prepare_clone(url, dest)
    .map_err(|e| CloneError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?
    .with_in_memory_config_overrides(vec![header]);

  let (mut checkout, _outcome) = prepared
    .fetch_then_checkout(gix::progress::Discard, should_interrupt)
    .map_err(|e| CloneError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let (repo, _outcome) = checkout
    .main_worktree(gix::progress::Discard, should_interrupt)
    .map_err(|e| CloneError::Checkout {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  debug!(git_dir = %repo.git_dir().display(), "clone complete");
  Ok(())
}

/// Commit message for a release.
pub fn commit_message(version: &str) -> String {
  format!("chore({}): release new version {}", PROJECT_NAME, version)
}

/// `git add <path>` inside `repo`.
pub fn add_command(config: &ReleaseConfig, repo: &Path, path: &Path) -> Exec {
  Exec::new(&config.tools.git, config.timeouts.subprocess)
    .arg("add")
    .arg("--")
    .arg(path.as_os_str())
    .current_dir(repo)
}

/// `git commit` under the release bot identity.
pub fn commit_command(config: &ReleaseConfig, repo: &Path) -> Exec {
  Exec::new(&config.tools.git, config.timeouts.subprocess)
    .arg("-c")
    .arg(format!("user.name={}", BOT_NAME))
    .arg("-c")
    .arg(format!("user.email={}", BOT_EMAIL))
    .arg("commit")
    .arg("-m")
    .arg(commit_message(&config.version))
    .current_dir(repo)
}

/// `git push origin HEAD:refs/heads/master`, authenticated with `token`.
pub fn push_command(config: &ReleaseConfig, repo: &Path, token: &AuthToken) -> Exec {
  Exec::new(&config.tools.git, config.timeouts.network)
    .arg("push")
    .arg("origin")
    .arg(format!("HEAD:refs/heads/{}", PUBLISH_BRANCH))
    .env("GIT_TERMINAL_PROMPT", "0")
    .env("GIT_CONFIG_COUNT", "1")
    .env("GIT_CONFIG_KEY_0", "http.extraHeader")
    .env("GIT_CONFIG_VALUE_0", authorization_header(token))
    .current_dir(repo)
}
