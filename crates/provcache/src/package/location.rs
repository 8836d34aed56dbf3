use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where the bytes of a package can be found.
///
/// Each variant is handled by exactly one installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PackageLocation {
    /// Absolute URL of a downloadable zip archive
    RemoteArchive(String),

    /// Zip archive already present on disk
    LocalArchive(PathBuf),

    /// Already unpacked package directory
    LocalDirectory(PathBuf),
}

impl PackageLocation {
    /// Path on disk for local locations, `None` for remote ones.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            PackageLocation::RemoteArchive(_) => None,
            PackageLocation::LocalArchive(path) | PackageLocation::LocalDirectory(path) => {
                Some(path)
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, PackageLocation::RemoteArchive(_))
    }
}

impl fmt::Display for PackageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageLocation::RemoteArchive(url) => f.write_str(url),
            PackageLocation::LocalArchive(path) | PackageLocation::LocalDirectory(path) => {
                write!(f, "{}", path.display())
            }
        }
    }
}
