//! Implementation of the `releaser publish` command.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use releaser_lib::channel::PublishChannel;
use releaser_lib::config::ReleaseConfig;
use releaser_lib::pipeline::publish_release;

use crate::output::{format_duration, print_stat, print_success};

/// Execute the publish command.
///
/// Pushes the manifests rendered by `prepare` to every channel concurrently.
pub fn cmd_publish(config: Arc<ReleaseConfig>) -> Result<()> {
  let start = Instant::now();
  let version = config.version.clone();
  let channels = PublishChannel::all();
  let names: Vec<String> = channels.iter().map(|c| c.name.clone()).collect();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(publish_release(config, channels))
    .context("Publish failed")?;

  println!();
  print_success(&format!(
    "Published v{} in {}",
    version,
    format_duration(start.elapsed())
  ));
  print_stat("Channels", &names.join(", "));

  Ok(())
}
