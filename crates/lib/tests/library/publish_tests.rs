//! Publishing rendered manifests to local bare repositories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use releaser_lib::channel::PublishChannel;
use releaser_lib::config::{AuthToken, ReleaseConfig};
use releaser_lib::consts::{BOT_EMAIL, BOT_NAME};
use releaser_lib::pipeline::{ReleaseError, publish_release};
use releaser_lib::platform::{BuildTarget, arch::Arch, os::Os};
use releaser_lib::publish::PublishWorker;
use releaser_lib::publish::git::commit_message;

use super::common::{TestProject, bare_remote, git, git_available};

const FORMULA: &str = "class SshAddWithPass < Formula\n  version \"3.1.0\"\nend\n";

fn local_channel(name: &str, remote: &Path) -> PublishChannel {
  PublishChannel {
    name: name.to_string(),
    remote_url: remote.to_string_lossy().into_owned(),
    template: PathBuf::from("brew.rb"),
    rendered: PathBuf::from(format!("{}-tap/ssh_add_with_pass.rb", name)),
    repo_path: PathBuf::from("Formula/ssh_add_with_pass.rb"),
    artifact: BuildTarget::new(Os::MacOs, Arch::Amd64),
  }
}

fn config_with_rendered(project: &TestProject, channels: &[&PublishChannel]) -> Arc<ReleaseConfig> {
  let mut config = project.config("3.1.0");
  config.token = Some(AuthToken::new("not-a-real-token"));
  for channel in channels {
    let path = channel.rendered_path(&config);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, FORMULA).unwrap();
  }
  Arc::new(config)
}

fn show(remote: &Path, object: &str) -> String {
  git(remote, &["show", object])
}

#[tokio::test]
async fn worker_commits_and_pushes_new_manifest() {
  if !git_available() {
    return;
  }
  let project = TestProject::new();
  let remote = bare_remote(project.path(), "tap", &[]);
  let channel = local_channel("tap", &remote);
  let config = config_with_rendered(&project, &[&channel]);
  let token = config.token.clone().unwrap();

  PublishWorker::new(config, channel, token).run().await.unwrap();

  assert_eq!(show(&remote, "master:Formula/ssh_add_with_pass.rb"), FORMULA.trim());
  assert_eq!(git(&remote, &["log", "-1", "--format=%s", "master"]), commit_message("3.1.0"));
  assert_eq!(
    git(&remote, &["log", "-1", "--format=%an <%ae>", "master"]),
    format!("{} <{}>", BOT_NAME, BOT_EMAIL)
  );
}

#[tokio::test]
async fn worker_replaces_existing_manifest() {
  if !git_available() {
    return;
  }
  let project = TestProject::new();
  let remote = bare_remote(
    project.path(),
    "tap",
    &[("Formula/ssh_add_with_pass.rb", "class Old < Formula\nend\n")],
  );
  let channel = local_channel("tap", &remote);
  let config = config_with_rendered(&project, &[&channel]);
  let token = config.token.clone().unwrap();

  PublishWorker::new(config, channel, token).run().await.unwrap();

  let published = show(&remote, "master:Formula/ssh_add_with_pass.rb");
  assert!(published.contains("3.1.0"));
  assert!(!published.contains("Old"));
  // Seed commit plus the release commit
  assert_eq!(git(&remote, &["rev-list", "--count", "master"]), "2");
}

#[tokio::test]
async fn stale_clone_from_previous_run_is_replaced() {
  if !git_available() {
    return;
  }
  let project = TestProject::new();
  let remote = bare_remote(project.path(), "tap", &[]);
  let channel = local_channel("tap", &remote);
  let config = config_with_rendered(&project, &[&channel]);
  let token = config.token.clone().unwrap();

  let stale = channel.clone_dir(&config).join("leftover.txt");
  std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
  std::fs::write(&stale, "from an earlier run").unwrap();

  PublishWorker::new(config, channel, token).run().await.unwrap();

  assert!(!stale.exists());
  assert_eq!(show(&remote, "master:Formula/ssh_add_with_pass.rb"), FORMULA.trim());
}

#[tokio::test]
async fn one_failing_channel_does_not_stop_the_other() {
  if !git_available() {
    return;
  }
  let project = TestProject::new();
  let remote = bare_remote(project.path(), "good", &[]);
  let good = local_channel("good", &remote);
  let bad = local_channel("bad", &project.path().join("does-not-exist.git"));
  let config = config_with_rendered(&project, &[&good, &bad]);

  let err = publish_release(config, vec![good, bad]).await.unwrap_err();

  match err {
    ReleaseError::Channels(failures) => {
      assert_eq!(failures.len(), 1);
      assert_eq!(failures[0].channel, "bad");
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(show(&remote, "master:Formula/ssh_add_with_pass.rb"), FORMULA.trim());
}

#[tokio::test]
async fn missing_rendered_manifest_fails_the_channel() {
  if !git_available() {
    return;
  }
  let project = TestProject::new();
  let remote = bare_remote(project.path(), "tap", &[]);
  let channel = local_channel("tap", &remote);
  let mut config = project.config("3.1.0");
  config.token = Some(AuthToken::new("t"));

  let result = publish_release(Arc::new(config), vec![channel]).await;

  assert!(matches!(result, Err(ReleaseError::Channels(ref f)) if f.len() == 1));
  assert_eq!(git(&remote, &["rev-list", "--count", "master"]), "1");
}
