mod cmd;
mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use releaser_lib::config::{
  AuthToken, DEFAULT_COMMIT_URL, DEFAULT_NFPM_VERSION, DEFAULT_VERSION, ReleaseConfig, Timeouts, Tools,
};

use cmd::{cmd_prepare, cmd_publish};

/// Build, package and publish ssh_add_with_pass releases
#[derive(Parser)]
#[command(name = "releaser")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(flatten)]
  release: ReleaseArgs,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Args)]
struct ReleaseArgs {
  /// Token used to authenticate against channel repositories
  #[arg(long, env = "GITHUB_TOKEN", global = true, hide_env_values = true)]
  github_token: Option<String>,

  /// nfpm image version used to build Linux packages
  #[arg(long, env = "NFPM_VERSION", global = true, default_value = DEFAULT_NFPM_VERSION)]
  nfpm_version: String,

  /// Version being released, without the leading `v`
  #[arg(long, env = "VERSION_NO", global = true, default_value = DEFAULT_VERSION)]
  version_no: String,

  /// Build date stamped into the binaries (defaults to now, RFC 3339)
  #[arg(long, env = "DATE", global = true)]
  date: Option<String>,

  /// Commit URL stamped into the binaries
  #[arg(long, env = "COMMIT_URL", global = true, default_value = DEFAULT_COMMIT_URL)]
  commit_url: String,

  /// Project root (defaults to the current directory)
  #[arg(long, env = "RELEASER_PROJECT_DIR", global = true)]
  project_dir: Option<PathBuf>,

  /// Upper bound for each go, docker or git invocation
  #[arg(
    long,
    env = "RELEASER_SUBPROCESS_TIMEOUT",
    global = true,
    default_value = "30m",
    value_parser = humantime::parse_duration
  )]
  subprocess_timeout: Duration,

  /// Upper bound for image pulls, clones and pushes
  #[arg(
    long,
    env = "RELEASER_NETWORK_TIMEOUT",
    global = true,
    default_value = "10m",
    value_parser = humantime::parse_duration
  )]
  network_timeout: Duration,

  /// Go toolchain executable
  #[arg(long, env = "RELEASER_GO", global = true, default_value = "go")]
  go: PathBuf,

  /// Container runtime executable
  #[arg(long, env = "RELEASER_DOCKER", global = true, default_value = "docker")]
  docker: PathBuf,

  /// Git executable
  #[arg(long, env = "RELEASER_GIT", global = true, default_value = "git")]
  git: PathBuf,
}

impl ReleaseArgs {
  /// Resolve arguments into the shared run configuration.
  fn into_config(self) -> Result<Arc<ReleaseConfig>> {
    let project_dir = match self.project_dir {
      Some(dir) => dir,
      None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    // Container mounts need an absolute host path
    let project_dir = dunce::canonicalize(&project_dir)
      .with_context(|| format!("Project directory not found: {}", project_dir.display()))?;

    let date = self
      .date
      .unwrap_or_else(|| humantime::format_rfc3339_seconds(SystemTime::now()).to_string());

    let mut config = ReleaseConfig::new(self.version_no, date, project_dir);
    config.commit_url = self.commit_url;
    config.nfpm_version = self.nfpm_version;
    config.token = self.github_token.filter(|t| !t.is_empty()).map(AuthToken::new);
    config.tools = Tools {
      go: self.go,
      docker: self.docker,
      git: self.git,
    };
    config.timeouts = Timeouts {
      subprocess: self.subprocess_timeout,
      network: self.network_timeout,
    };
    Ok(Arc::new(config))
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Compile every target, then package, checksum and render channel manifests
  Prepare,

  /// Push rendered manifests to the Homebrew tap and Scoop bucket
  Publish,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let config = cli.release.into_config()?;
  debug!(
    version = %config.version,
    project = %config.project_dir.display(),
    nfpm = %config.nfpm_image(),
    "resolved configuration"
  );

  match cli.command {
    Commands::Prepare => cmd_prepare(config),
    Commands::Publish => cmd_publish(config),
  }
}
