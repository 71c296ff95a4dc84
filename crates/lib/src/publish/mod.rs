//! Publishing rendered manifests to their channel repositories.
//!
//! Each [`PublishWorker`] owns one channel and its own clone directory, and
//! runs its steps strictly in order:
//!
//! 1. clone the channel repository into a fresh directory
//! 2. delete the existing manifest, if any
//! 3. copy the rendered manifest into place
//! 4. stage it
//! 5. commit under the release bot identity
//! 6. push to `master` on `origin`
//!
//! Workers for different channels share nothing and run concurrently.

pub mod git;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::fs;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::channel::PublishChannel;
use crate::config::{AuthToken, ReleaseConfig};
use crate::process::ProcessError;

use git::CloneError;

/// Errors raised by a single publish step.
#[derive(Debug, Error)]
pub enum PublishError {
  #[error(transparent)]
  Clone(#[from] CloneError),

  #[error("clone of '{url}' timed out after {timeout:?}")]
  CloneTimedOut { url: String, timeout: Duration },

  #[error("git {step} failed: {source}")]
  Git {
    step: &'static str,
    #[source]
    source: ProcessError,
  },

  #[error("io error on '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("publish task failed: {0}")]
  Task(String),
}

/// A publish failure tagged with its channel.
#[derive(Debug, Error)]
#[error("channel '{channel}': {source}")]
pub struct ChannelError {
  pub channel: String,
  #[source]
  pub source: PublishError,
}

/// Delete `path` if it exists.
///
/// Returns whether a file was removed. A missing file is expected (fresh
/// clones of new channels) and is not an error; anything else is.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
  match fs::remove_file(path).await {
    Ok(()) => {
      info!(path = %path.display(), "deleted");
      Ok(true)
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      info!(path = %path.display(), "nothing to delete");
      Ok(false)
    }
    Err(e) => Err(e),
  }
}

/// Publishes one channel.
#[derive(Debug, Clone)]
pub struct PublishWorker {
  config: Arc<ReleaseConfig>,
  channel: PublishChannel,
  token: AuthToken,
}

impl PublishWorker {
  pub fn new(config: Arc<ReleaseConfig>, channel: PublishChannel, token: AuthToken) -> Self {
    Self { config, channel, token }
  }

  /// Local clone directory for this channel.
  pub fn clone_dir(&self) -> PathBuf {
    self.channel.clone_dir(&self.config)
  }

  /// Absolute manifest path inside the clone.
  pub fn manifest_path(&self) -> PathBuf {
    self.clone_dir().join(&self.channel.repo_path)
  }

  /// Run all six steps in order.
  pub async fn run(&self) -> Result<(), PublishError> {
    self.clone_repo().await?;
    self.remove_existing().await?;
    self.copy_manifest().await?;
    self.stage().await?;
    self.commit().await?;
    self.push().await?;
    info!(channel = %self.channel.name, version = %self.config.version, "published");
    Ok(())
  }

  /// Clone into a fresh directory, replacing any clone left by an earlier run.
  ///
  /// The clone runs on its own thread. When the network timeout expires the
  /// clone is told to interrupt and the thread is detached, so a hung remote
  /// cannot keep the runtime from shutting down.
  pub async fn clone_repo(&self) -> Result<(), PublishError> {
    let dest = self.clone_dir();
    match fs::remove_dir_all(&dest).await {
      Ok(()) => debug!(path = %dest.display(), "removed stale clone"),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(source) => return Err(PublishError::Io { path: dest, source }),
    }

    let url = self.channel.remote_url.clone();
    let timeout = self.config.timeouts.network;
    let interrupt = Arc::new(AtomicBool::new(false));
    let (tx, rx) = oneshot::channel();

    let task_url = url.clone();
    let token = self.token.clone();
    let should_interrupt = interrupt.clone();
    std::thread::Builder::new()
      .name(format!("clone-{}", self.channel.name))
      .spawn(move || {
        let result = git::clone_repo(&task_url, &dest, &token, &should_interrupt);
        // The receiver is gone once the clone timed out
        let _ = tx.send(result);
      })
      .map_err(|e| PublishError::Task(e.to_string()))?;

    match tokio::time::timeout(timeout, rx).await {
      Ok(Ok(result)) => Ok(result?),
      Ok(Err(_)) => Err(PublishError::Task("clone thread exited without a result".to_string())),
      Err(_) => {
        interrupt.store(true, Ordering::Relaxed);
        warn!(url = %url, timeout = ?timeout, "clone timed out, interrupting");
        Err(PublishError::CloneTimedOut { url, timeout })
      }
    }
  }

  /// Delete the manifest inside the clone, tolerating its absence.
  pub async fn remove_existing(&self) -> Result<bool, PublishError> {
    let path = self.manifest_path();
    remove_if_exists(&path)
      .await
      .map_err(|source| PublishError::Io { path, source })
  }

  /// Copy the rendered manifest into the clone.
  pub async fn copy_manifest(&self) -> Result<(), PublishError> {
    let from = self.channel.rendered_path(&self.config);
    let to = self.manifest_path();

    if let Some(parent) = to.parent() {
      fs::create_dir_all(parent).await.map_err(|source| PublishError::Io {
        path: parent.to_path_buf(),
        source,
      })?;
    }
    fs::copy(&from, &to)
      .await
      .map_err(|source| PublishError::Io { path: from.clone(), source })?;

    info!(from = %from.display(), to = %to.display(), "copied manifest");
    Ok(())
  }

  pub async fn stage(&self) -> Result<(), PublishError> {
    git::add_command(&self.config, &self.clone_dir(), &self.channel.repo_path)
      .run()
      .await
      .map_err(|source| PublishError::Git { step: "add", source })
  }

  pub async fn commit(&self) -> Result<(), PublishError> {
    git::commit_command(&self.config, &self.clone_dir())
      .run()
      .await
      .map_err(|source| PublishError::Git { step: "commit", source })
  }

  pub async fn push(&self) -> Result<(), PublishError> {
    git::push_command(&self.config, &self.clone_dir(), &self.token)
      .run()
      .await
      .map_err(|source| PublishError::Git { step: "push", source })
  }
}

/// Publish every channel concurrently.
///
/// A failing channel never stops the others; every failure is logged and all
/// of them are returned together.
pub async fn publish_all(
  config: Arc<ReleaseConfig>,
  channels: Vec<PublishChannel>,
  token: AuthToken,
) -> Result<(), Vec<ChannelError>> {
  let runs = channels.into_iter().map(|channel| {
    let name = channel.name.clone();
    let worker = PublishWorker::new(config.clone(), channel, token.clone());
    (name, async move { worker.run().await })
  });
  join_channels(runs).await
}

/// Run one future per named channel and collect every failure under its
/// channel name, including tasks that panicked.
async fn join_channels<I, F>(runs: I) -> Result<(), Vec<ChannelError>>
where
  I: IntoIterator<Item = (String, F)>,
  F: Future<Output = Result<(), PublishError>> + Send + 'static,
{
  let mut join_set = JoinSet::new();
  let mut task_channels = HashMap::new();

  for (name, run) in runs {
    let span = info_span!("publish", channel = %name);
    let handle = join_set.spawn(run.instrument(span));
    task_channels.insert(handle.id(), name);
  }

  let mut failures = Vec::new();
  while let Some(joined) = join_set.join_next_with_id().await {
    let failure = match joined {
      Ok((_, Ok(()))) => continue,
      Ok((id, Err(source))) => ChannelError {
        channel: channel_name(&task_channels, id),
        source,
      },
      Err(e) => ChannelError {
        channel: channel_name(&task_channels, e.id()),
        source: PublishError::Task(e.to_string()),
      },
    };
    error!(error = %failure, "publish failed");
    failures.push(failure);
  }

  if failures.is_empty() { Ok(()) } else { Err(failures) }
}

fn channel_name(names: &HashMap<tokio::task::Id, String>, id: tokio::task::Id) -> String {
  names.get(&id).cloned().unwrap_or_else(|| format!("task {}", id))
}
