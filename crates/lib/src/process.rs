//! Subprocess execution.
//!
//! Every external program the pipeline drives (compiler, container runtime,
//! git) goes through [`Exec`]. Output is streamed into the log as it arrives
//! (stdout at `info`, stderr at `warn`) under the caller's tracing span, and
//! each run is bounded by a timeout after which the child is killed.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Errors that can occur while running a subprocess.
#[derive(Debug, Error)]
pub enum ProcessError {
  /// The program could not be started (missing binary, permissions).
  #[error("failed to spawn '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// Waiting on the child failed.
  #[error("failed to wait on '{cmd}': {source}")]
  Wait {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  /// The program exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  Failed { cmd: String, code: Option<i32> },

  /// The program did not finish in time and was killed.
  #[error("command timed out after {timeout:?}: {cmd}")]
  TimedOut { cmd: String, timeout: Duration },
}

/// A subprocess invocation.
#[derive(Debug, Clone)]
pub struct Exec {
  program: PathBuf,
  args: Vec<OsString>,
  env: BTreeMap<String, String>,
  cwd: Option<PathBuf>,
  timeout: Duration,
}

impl Exec {
  pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      env: BTreeMap::new(),
      cwd: None,
      timeout,
    }
  }

  pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Add an environment variable on top of the inherited environment.
  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.cwd = Some(dir.as_ref().to_path_buf());
    self
  }

  /// The arguments this invocation will receive.
  pub fn get_args(&self) -> &[OsString] {
    &self.args
  }

  /// The extra environment this invocation will receive.
  pub fn get_env(&self) -> &BTreeMap<String, String> {
    &self.env
  }

  /// Human readable command line, used in logs and errors.
  pub fn display(&self) -> String {
    let mut out = self.program.to_string_lossy().into_owned();
    for arg in &self.args {
      out.push(' ');
      out.push_str(&arg.to_string_lossy());
    }
    out
  }

  /// Run to completion, failing on a non-zero exit or on timeout.
  pub async fn run(self) -> Result<(), ProcessError> {
    let cmd = self.display();
    info!(cmd = %cmd, "executing command");

    let mut command = Command::new(&self.program);
    command
      .args(&self.args)
      .envs(&self.env)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    if let Some(cwd) = &self.cwd {
      command.current_dir(cwd);
    }

    debug!(working_dir = ?self.cwd, env = ?self.env.keys().collect::<Vec<_>>(), "spawning process");

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
      program: self.program.to_string_lossy().into_owned(),
      source,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let waited = tokio::time::timeout(self.timeout, async {
      let (_, _, status) = tokio::join!(forward_lines(stdout, false), forward_lines(stderr, true), child.wait());
      status
    })
    .await;

    // Dropping `child` on the timeout path kills it.
    let status = match waited {
      Ok(status) => status.map_err(|source| ProcessError::Wait {
        cmd: cmd.clone(),
        source,
      })?,
      Err(_) => {
        warn!(cmd = %cmd, timeout = ?self.timeout, "command timed out, killing");
        return Err(ProcessError::TimedOut {
          cmd,
          timeout: self.timeout,
        });
      }
    };

    if !status.success() {
      return Err(ProcessError::Failed {
        cmd,
        code: status.code(),
      });
    }

    debug!(cmd = %cmd, "command finished");
    Ok(())
  }
}

/// Forward each line of a child stream into the log.
///
/// Lines are decoded lossily and the stream is drained to EOF, so a child
/// writing invalid UTF-8 never sees its pipe closed early.
async fn forward_lines<R: AsyncRead + Unpin>(reader: Option<R>, is_stderr: bool) {
  let Some(reader) = reader else {
    return;
  };
  let mut reader = BufReader::new(reader);
  let mut buf = Vec::new();
  loop {
    buf.clear();
    match reader.read_until(b'\n', &mut buf).await {
      Ok(0) => break,
      Ok(_) => {
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if is_stderr {
          warn!("{}", line);
        } else {
          info!("{}", line);
        }
      }
      Err(e) => {
        debug!(error = %e, "stopped reading child output");
        break;
      }
    }
  }
}
