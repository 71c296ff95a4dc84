//! Build targets and the per-target naming conventions.

pub mod arch;
pub mod os;
pub mod paths;

use arch::Arch;
use os::Os;
use std::fmt;

use crate::consts::PROJECT_NAME;

/// Archive container used for a target's download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
  Zip,
  TarGz,
}

impl ArchiveFormat {
  /// File extension, without the leading dot
  pub fn extension(&self) -> &'static str {
    match self {
      Self::Zip => "zip",
      Self::TarGz => "tar.gz",
    }
  }
}

/// Native package formats produced by nfpm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageKind {
  Apk,
  Rpm,
  Deb,
}

impl PackageKind {
  pub const ALL: [PackageKind; 3] = [PackageKind::Apk, PackageKind::Rpm, PackageKind::Deb];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Apk => "apk",
      Self::Rpm => "rpm",
      Self::Deb => "deb",
    }
  }
}

impl fmt::Display for PackageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// One (OS, architecture) pair of the build matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildTarget {
  pub os: Os,
  pub arch: Arch,
}

impl BuildTarget {
  pub fn new(os: Os, arch: Arch) -> Self {
    Self { os, arch }
  }

  /// The fixed release matrix: linux, darwin and windows on amd64.
  pub fn matrix() -> Vec<Self> {
    Os::ALL.iter().map(|os| Self::new(*os, Arch::Amd64)).collect()
  }

  /// `<project>_<os>_<arch>`, the stem shared by every artifact of this target
  pub fn stem(&self) -> String {
    format!("{}_{}_{}", PROJECT_NAME, self.os, self.arch)
  }

  /// Compiled binary file name inside `dist/`
  pub fn binary_file_name(&self) -> String {
    format!("{}{}", self.stem(), self.os.exe_suffix())
  }

  /// Name of the binary inside the archive
  pub fn binary_entry_name(&self) -> String {
    format!("{}{}", PROJECT_NAME, self.os.exe_suffix())
  }

  pub fn archive_format(&self) -> ArchiveFormat {
    match self.os {
      Os::Windows => ArchiveFormat::Zip,
      Os::Linux | Os::MacOs => ArchiveFormat::TarGz,
    }
  }

  /// Archive file name inside the downloads directory
  pub fn archive_file_name(&self) -> String {
    format!("{}.{}", self.stem(), self.archive_format().extension())
  }

  /// Native packages produced for this target (linux only)
  pub fn package_kinds(&self) -> &'static [PackageKind] {
    match self.os {
      Os::Linux => &PackageKind::ALL,
      Os::MacOs | Os::Windows => &[],
    }
  }

  /// Native package file name inside the downloads directory
  pub fn package_file_name(&self, kind: PackageKind) -> String {
    format!("{}.{}", self.stem(), kind)
  }
}

impl fmt::Display for BuildTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.os, self.arch)
  }
}
