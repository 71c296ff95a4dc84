//! Implementation of the `releaser prepare` command.
//!
//! Builds every target, produces archives and Linux packages, writes the
//! checksum manifest and renders the channel manifests.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use releaser_lib::channel::PublishChannel;
use releaser_lib::config::ReleaseConfig;
use releaser_lib::pipeline::prepare_release;

use crate::output::{format_duration, print_stat, print_success};

/// Execute the prepare command.
///
/// Prints a summary of the produced artifacts on success. Any failing target
/// fails the whole command.
pub fn cmd_prepare(config: Arc<ReleaseConfig>) -> Result<()> {
  let start = Instant::now();
  let version = config.version.clone();
  let downloads = config.downloads_dir();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt
    .block_on(prepare_release(config, &PublishChannel::all()))
    .context("Prepare failed")?;

  println!();
  print_success(&format!(
    "Prepared release v{} in {}",
    version,
    format_duration(start.elapsed())
  ));
  print_stat("Targets", &outcome.artifacts.len().to_string());
  print_stat("Files checksummed", &outcome.checksums.len().to_string());
  print_stat("Manifests rendered", &outcome.manifests.len().to_string());
  print_stat("Output", &downloads.display().to_string());

  Ok(())
}
