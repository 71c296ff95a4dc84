//! Fixed names shared across the release pipeline.

/// Name of the binary being released.
pub const PROJECT_NAME: &str = "ssh_add_with_pass";

/// Output directory, relative to the project directory.
pub const DIST_DIR: &str = "dist";

/// Directory holding every published download, relative to [`DIST_DIR`].
pub const DOWNLOADS_DIR: &str = "github-downloads";

/// Checksum manifest file name inside the downloads directory.
pub const CHECKSUMS_FILE: &str = "sha256_checksums.txt";

/// Files copied into every archive next to the binary.
pub const ARCHIVE_DOCS: [&str; 3] = ["README.md", "CHANGELOG.md", "LICENSE"];

/// Container image used to build native packages, without the version tag.
pub const NFPM_IMAGE: &str = "goreleaser/nfpm";

/// Identity used for release commits.
pub const BOT_NAME: &str = "semantic-release-bot";
pub const BOT_EMAIL: &str = "semantic-release-bot@martynus.net";

/// Branch receiving release commits on every channel.
pub const PUBLISH_BRANCH: &str = "master";

/// Username sent alongside the auth token for HTTPS git operations.
pub const TOKEN_USERNAME: &str = "token";
