//! End-to-end `prepare` runs against stub `go` and `docker` programs.

use std::collections::BTreeSet;
use std::fs::File;
use std::sync::Arc;

use flate2::read::GzDecoder;
use releaser_lib::channel::PublishChannel;
use releaser_lib::consts::CHECKSUMS_FILE;
use releaser_lib::pipeline::{ReleaseError, prepare_release};
use releaser_lib::util::hash::hash_file;
use serial_test::serial;

use super::common::TestProject;

/// Stub toolchain: writes a fake binary to the `-o` path, after an
/// OS-specific delay so targets finish in a chosen order.
fn fake_go(linux_delay: &str, darwin_delay: &str, windows_delay: &str) -> String {
  format!(
    r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
case "$GOOS" in
  linux) sleep {linux_delay} ;;
  darwin) sleep {darwin_delay} ;;
  windows) sleep {windows_delay} ;;
esac
printf 'binary %s/%s cgo=%s\n' "$GOOS" "$GOARCH" "$CGO_ENABLED" > "$out"
"#
  )
}

/// Stub container runtime: `pull` succeeds, `run` writes the `--target` file.
const FAKE_DOCKER: &str = r#"if [ "$1" = "pull" ]; then exit 0; fi
target=""
version=""
while [ $# -gt 0 ]; do
  case "$1" in
    --target) target="$2"; shift ;;
    -e) version="$2"; shift ;;
  esac
  shift
done
printf 'package %s\n' "$version" > "$target"
"#;

const FAILING_DOCKER: &str = r#"if [ "$1" = "pull" ]; then exit 0; fi
echo "nfpm exploded" >&2
exit 7
"#;

fn stubbed_project(go: &str, docker: &str) -> (TestProject, Arc<releaser_lib::config::ReleaseConfig>) {
  let project = TestProject::new();
  let mut config = project.config("2.0.0");
  config.tools.go = project.script("go", go);
  config.tools.docker = project.script("docker", docker);
  (project, Arc::new(config))
}

fn download_names(config: &releaser_lib::config::ReleaseConfig) -> BTreeSet<String> {
  std::fs::read_dir(config.downloads_dir())
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect()
}

#[tokio::test]
#[serial]
async fn prepare_produces_every_artifact() {
  let (_project, config) = stubbed_project(&fake_go("0", "0", "0"), FAKE_DOCKER);

  let outcome = prepare_release(config.clone(), &PublishChannel::all()).await.unwrap();

  let expected: BTreeSet<String> = [
    "ssh_add_with_pass_linux_amd64.tar.gz",
    "ssh_add_with_pass_darwin_amd64.tar.gz",
    "ssh_add_with_pass_windows_amd64.zip",
    "ssh_add_with_pass_linux_amd64.apk",
    "ssh_add_with_pass_linux_amd64.rpm",
    "ssh_add_with_pass_linux_amd64.deb",
    CHECKSUMS_FILE,
  ]
  .iter()
  .map(|s| s.to_string())
  .collect();
  assert_eq!(download_names(&config), expected);

  assert_eq!(outcome.artifacts.len(), 3);
  assert!(config.dist_dir().join("ssh_add_with_pass_windows_amd64.exe").is_file());
  assert!(config.dist_dir().join("ssh_add_with_pass_linux_amd64").is_file());

  let deb = std::fs::read_to_string(config.downloads_dir().join("ssh_add_with_pass_linux_amd64.deb")).unwrap();
  assert_eq!(deb.trim(), "package VERSION=2.0.0");
}

#[tokio::test]
#[serial]
async fn checksum_manifest_matches_directory() {
  let (_project, config) = stubbed_project(&fake_go("0", "0", "0"), FAKE_DOCKER);

  prepare_release(config.clone(), &PublishChannel::all()).await.unwrap();

  let manifest = std::fs::read_to_string(config.checksums_path()).unwrap();
  let lines: Vec<&str> = manifest.lines().collect();
  let files: BTreeSet<String> = download_names(&config)
    .into_iter()
    .filter(|name| name != CHECKSUMS_FILE)
    .collect();

  assert_eq!(lines.len(), files.len());
  let mut seen = BTreeSet::new();
  for line in lines {
    let (digest, name) = line.split_once("  ").unwrap();
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    assert!(files.contains(name), "manifest lists unknown file {name}");
    assert_eq!(hash_file(&config.downloads_dir().join(name)).unwrap().as_str(), digest);
    assert!(seen.insert(name.to_string()), "duplicate line for {name}");
  }
}

#[tokio::test]
#[serial]
async fn rendered_manifests_embed_version_and_archive_hash() {
  let (_project, config) = stubbed_project(&fake_go("0", "0", "0"), FAKE_DOCKER);

  let outcome = prepare_release(config.clone(), &PublishChannel::all()).await.unwrap();

  let darwin_hash = hash_file(&config.downloads_dir().join("ssh_add_with_pass_darwin_amd64.tar.gz")).unwrap();
  let windows_hash = hash_file(&config.downloads_dir().join("ssh_add_with_pass_windows_amd64.zip")).unwrap();

  let brew = std::fs::read_to_string(PublishChannel::homebrew().rendered_path(&config)).unwrap();
  assert!(brew.contains("version \"2.0.0\""));
  assert!(brew.contains(&format!("sha256 \"{}\"", darwin_hash)));
  assert!(brew.contains("download/v2.0.0/ssh_add_with_pass_darwin_amd64.tar.gz"));
  assert!(!brew.contains("${"));

  let scoop = std::fs::read_to_string(PublishChannel::scoop().rendered_path(&config)).unwrap();
  assert!(scoop.contains(&format!("\"hash\": \"{}\"", windows_hash)));
  assert!(!scoop.contains("${"));

  assert_eq!(outcome.manifests.len(), 2);
}

#[tokio::test]
#[serial]
async fn archives_hold_docs_and_binary() {
  let (_project, config) = stubbed_project(&fake_go("0", "0", "0"), FAKE_DOCKER);

  prepare_release(config.clone(), &PublishChannel::all()).await.unwrap();

  let file = File::open(config.downloads_dir().join("ssh_add_with_pass_linux_amd64.tar.gz")).unwrap();
  let mut archive = tar::Archive::new(GzDecoder::new(file));
  let names: Vec<String> = archive
    .entries()
    .unwrap()
    .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
    .collect();
  assert_eq!(names, vec!["README.md", "CHANGELOG.md", "LICENSE", "ssh_add_with_pass"]);
}

#[tokio::test]
#[serial]
async fn completion_order_does_not_change_artifacts() {
  let (_a, fast_linux) = stubbed_project(&fake_go("0", "0.2", "0.4"), FAKE_DOCKER);
  let (_b, slow_linux) = stubbed_project(&fake_go("0.4", "0.2", "0"), FAKE_DOCKER);

  let first = prepare_release(fast_linux.clone(), &PublishChannel::all()).await.unwrap();
  let second = prepare_release(slow_linux.clone(), &PublishChannel::all()).await.unwrap();

  assert_eq!(download_names(&fast_linux), download_names(&slow_linux));
  let first_targets: Vec<_> = first.artifacts.iter().map(|a| a.target).collect();
  let second_targets: Vec<_> = second.artifacts.iter().map(|a| a.target).collect();
  assert_eq!(first_targets, second_targets);

  // Identical inputs give identical binaries regardless of build order
  for name in ["ssh_add_with_pass_linux_amd64", "ssh_add_with_pass_darwin_amd64"] {
    assert_eq!(
      std::fs::read(fast_linux.dist_dir().join(name)).unwrap(),
      std::fs::read(slow_linux.dist_dir().join(name)).unwrap()
    );
  }
}

#[tokio::test]
#[serial]
async fn packaging_failure_fails_the_run_without_masking_other_targets() {
  let (_project, config) = stubbed_project(&fake_go("0", "0", "0"), FAILING_DOCKER);

  let err = prepare_release(config.clone(), &PublishChannel::all()).await.unwrap_err();

  match &err {
    ReleaseError::Targets(failures) => {
      assert_eq!(failures.len(), 1);
      assert!(err.to_string().contains("linux/amd64"));
    }
    other => panic!("unexpected error: {other}"),
  }
  // Other targets still ran to completion
  assert!(config.downloads_dir().join("ssh_add_with_pass_darwin_amd64.tar.gz").is_file());
  assert!(config.downloads_dir().join("ssh_add_with_pass_windows_amd64.zip").is_file());
  // No checksums or manifests after a failed build
  assert!(!config.checksums_path().exists());
}

#[tokio::test]
#[serial]
async fn compile_failure_is_reported_per_target() {
  let go = r#"echo "no Go files" >&2
exit 1
"#;
  let (_project, config) = stubbed_project(go, FAKE_DOCKER);

  let err = prepare_release(config, &PublishChannel::all()).await.unwrap_err();

  match err {
    ReleaseError::Targets(failures) => assert_eq!(failures.len(), 3),
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
#[serial]
async fn missing_template_fails_render() {
  let (project, config) = stubbed_project(&fake_go("0", "0", "0"), FAKE_DOCKER);
  std::fs::remove_file(project.path().join("scoop.json")).unwrap();

  let err = prepare_release(config, &PublishChannel::all()).await.unwrap_err();

  assert!(matches!(err, ReleaseError::Render(_)));
}
