//! Distribution manifest rendering.
//!
//! Templates are plain text containing two tokens:
//!
//! - `${VERSION}` - the release version
//! - `${HASH}` - the SHA-256 digest of the channel's archive
//!
//! Every occurrence of each token is replaced in a single left-to-right pass.
//! Substituted values are never rescanned, and any other `${...}` sequence is
//! copied through untouched. A value that itself contains a token is rejected
//! by [`render_channel`], so no token survives into a rendered manifest.
//!
//! # Example
//!
//! ```
//! use releaser_lib::render::{TemplateValues, render};
//!
//! let values = TemplateValues { version: "1.2.3", hash: "abc" };
//! assert_eq!(render("${VERSION}-${VERSION}", &values), "1.2.3-1.2.3");
//! ```

use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::channel::PublishChannel;
use crate::checksum::ChecksumManifest;
use crate::config::ReleaseConfig;

pub const VERSION_TOKEN: &str = "${VERSION}";
pub const HASH_TOKEN: &str = "${HASH}";

/// Errors that can occur while rendering a channel manifest.
#[derive(Debug, Error)]
pub enum RenderError {
  #[error("failed to read template '{path}': {source}")]
  ReadTemplate {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("no checksum recorded for '{file_name}' (needed by channel '{channel}')")]
  MissingChecksum { channel: String, file_name: String },

  #[error("value '{value}' for channel '{channel}' contains a template token")]
  TokenInValue { channel: String, value: String },

  #[error("failed to write '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
  pub version: &'a str,
  pub hash: &'a str,
}

impl TemplateValues<'_> {
  /// The first value that contains a template token, if any.
  pub fn token_bearing_value(&self) -> Option<&str> {
    [self.version, self.hash]
      .into_iter()
      .find(|value| value.contains(VERSION_TOKEN) || value.contains(HASH_TOKEN))
  }
}

/// Replace every `${VERSION}` and `${HASH}` token in `template`.
///
/// Values are inserted verbatim; callers must not pass values that contain a
/// token (see [`TemplateValues::token_bearing_value`]).
pub fn render(template: &str, values: &TemplateValues<'_>) -> String {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;

  while let Some(pos) = rest.find("${") {
    out.push_str(&rest[..pos]);
    let tail = &rest[pos..];

    if let Some(after) = tail.strip_prefix(VERSION_TOKEN) {
      out.push_str(values.version);
      rest = after;
    } else if let Some(after) = tail.strip_prefix(HASH_TOKEN) {
      out.push_str(values.hash);
      rest = after;
    } else {
      out.push_str("${");
      rest = &tail[2..];
    }
  }

  out.push_str(rest);
  out
}

/// Render `channel`'s template into its dist location.
///
/// The digest comes from `checksums`, keyed by the channel's archive name.
pub async fn render_channel(
  config: &ReleaseConfig,
  channel: &PublishChannel,
  checksums: &ChecksumManifest,
) -> Result<PathBuf, RenderError> {
  let file_name = channel.artifact_file_name();
  let hash = checksums.get(&file_name).ok_or_else(|| RenderError::MissingChecksum {
    channel: channel.name.clone(),
    file_name: file_name.clone(),
  })?;

  let values = TemplateValues {
    version: &config.version,
    hash: hash.as_str(),
  };
  if let Some(value) = values.token_bearing_value() {
    return Err(RenderError::TokenInValue {
      channel: channel.name.clone(),
      value: value.to_string(),
    });
  }

  let template_path = channel.template_path(config);
  let template = fs::read_to_string(&template_path)
    .await
    .map_err(|source| RenderError::ReadTemplate {
      path: template_path.clone(),
      source,
    })?;

  let rendered = render(&template, &values);

  let out_path = channel.rendered_path(config);
  let write_err = |source: std::io::Error| RenderError::Write {
    path: out_path.clone(),
    source,
  };
  if let Some(parent) = out_path.parent() {
    fs::create_dir_all(parent).await.map_err(write_err)?;
  }
  fs::write(&out_path, rendered).await.map_err(write_err)?;

  info!(channel = %channel.name, path = %out_path.display(), "written manifest");
  Ok(out_path)
}

/// Render every channel, in order.
pub async fn render_all(
  config: &ReleaseConfig,
  channels: &[PublishChannel],
  checksums: &ChecksumManifest,
) -> Result<Vec<PathBuf>, RenderError> {
  let mut written = Vec::with_capacity(channels.len());
  for channel in channels {
    written.push(render_channel(config, channel, checksums).await?);
  }
  Ok(written)
}
