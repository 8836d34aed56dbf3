//! Path downloader - installs packages from local directories using symlinks or copies.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::{InstallError, Result};

/// How a directory package is materialized at its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkMode {
    /// Symlink to the source directory, copying only if the link fails
    #[default]
    SymlinkOrCopy,
    /// Always copy (for filesystems without symlink support)
    CopyOnly,
}

/// Strategy that was actually used for an installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStrategy {
    Symlink,
    Copy,
}

/// Result of a path installation
#[derive(Debug)]
pub struct PathInstallResult {
    /// Absolute path where the package was installed
    pub path: PathBuf,
    /// Strategy used for installation
    pub strategy: PathStrategy,
}

type SymlinkFn = fn(&Path, &Path) -> io::Result<()>;

/// Path downloader for installing packages from local directories
pub struct PathDownloader {
    link_mode: LinkMode,
    symlink: SymlinkFn,
}

impl PathDownloader {
    pub fn new() -> Self {
        Self::with_link_mode(LinkMode::default())
    }

    pub fn with_link_mode(link_mode: LinkMode) -> Self {
        Self {
            link_mode,
            symlink: symlink_dir,
        }
    }

    /// Replace how directory links are created
    #[cfg(test)]
    fn with_symlink_fn(mut self, symlink: SymlinkFn) -> Self {
        self.symlink = symlink;
        self
    }

    /// Install the package directory `source_dir` at `target_dir`.
    ///
    /// Anything already at `target_dir` is replaced. The symlink always
    /// points at the absolute source path, since the source is usually a
    /// shared directory that does not move together with the target.
    pub fn install(&self, source_dir: &Path, target_dir: &Path) -> Result<PathInstallResult> {
        let abs_target = std::path::absolute(target_dir).map_err(|source| {
            InstallError::PathResolution {
                path: target_dir.to_path_buf(),
                source,
            }
        })?;
        let abs_source = std::path::absolute(source_dir).map_err(|source| {
            InstallError::PathResolution {
                path: source_dir.to_path_buf(),
                source,
            }
        })?;

        match fs::metadata(&abs_source) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(InstallError::PathResolution {
                    path: abs_source,
                    source: io::Error::other("package source is not a directory"),
                });
            }
            Err(source) => {
                return Err(InstallError::PathResolution {
                    path: abs_source,
                    source,
                });
            }
        }

        // Removing the target below would delete the source if they are the
        // same physical directory.
        match same_directory(&abs_target, &abs_source) {
            Ok(true) => {
                return Err(InstallError::SelfInstall {
                    target_dir: target_dir.to_path_buf(),
                });
            }
            Ok(false) => {}
            Err(source) => {
                return Err(InstallError::PathResolution {
                    path: abs_target,
                    source,
                });
            }
        }

        remove_existing(&abs_target).map_err(|source| InstallError::Removal {
            source_dir: abs_source.clone(),
            target_dir: abs_target.clone(),
            source,
        })?;

        if let Some(parent) = abs_target.parent() {
            fs::create_dir_all(parent).map_err(|source| InstallError::CreateParent {
                target_dir: abs_target.clone(),
                source,
            })?;
        }

        if self.link_mode == LinkMode::SymlinkOrCopy {
            match (self.symlink)(&abs_source, &abs_target) {
                Ok(()) => {
                    log::debug!(
                        "Linked {} -> {}",
                        abs_target.display(),
                        abs_source.display()
                    );
                    return Ok(PathInstallResult {
                        path: abs_target,
                        strategy: PathStrategy::Symlink,
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Could not symlink {} to {} ({}), copying instead",
                        abs_source.display(),
                        abs_target.display(),
                        e
                    );
                }
            }
        }

        copy_dir(&abs_target, &abs_source).map_err(|source| InstallError::Install {
            source_dir: abs_source.clone(),
            target_dir: abs_target.clone(),
            source,
        })?;
        log::debug!("Copied {} to {}", abs_source.display(), abs_target.display());

        Ok(PathInstallResult {
            path: abs_target,
            strategy: PathStrategy::Copy,
        })
    }
}

impl Default for PathDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PathDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathDownloader")
            .field("link_mode", &self.link_mode)
            .finish()
    }
}

/// Whether installing `source` at `target` would replace `source` itself.
///
/// The target is examined without following a trailing symlink, since an
/// existing link at the target is what gets replaced. The source is followed,
/// so a source that is a link to the target counts as the same directory.
/// A path that does not exist is never the same as anything.
pub fn same_directory(target: &Path, source: &Path) -> io::Result<bool> {
    if target == source {
        return Ok(true);
    }

    let Some(target_meta) = symlink_metadata_if_exists(target)? else {
        return Ok(false);
    };
    let source_meta = match fs::metadata(source) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    same_entry(target, &target_meta, source, &source_meta)
}

fn symlink_metadata_if_exists(path: &Path) -> io::Result<Option<fs::Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn same_entry(
    _target: &Path,
    target_meta: &fs::Metadata,
    _source: &Path,
    source_meta: &fs::Metadata,
) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;
    Ok(target_meta.dev() == source_meta.dev() && target_meta.ino() == source_meta.ino())
}

#[cfg(not(unix))]
fn same_entry(
    target: &Path,
    target_meta: &fs::Metadata,
    source: &Path,
    _source_meta: &fs::Metadata,
) -> io::Result<bool> {
    if target_meta.file_type().is_symlink() {
        return Ok(false);
    }
    Ok(target.canonicalize()? == source.canonicalize()?)
}

/// Remove a file, symlink or directory tree; a missing path is fine.
fn remove_existing(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            // Directory symlinks on Windows need remove_dir
            fs::remove_file(path).or_else(|_| fs::remove_dir(path))
        }
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn symlink_dir(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink_dir(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(original, link)
}

/// Recursively copy the contents of `src` into `dest`.
///
/// Symlinks inside the tree are recreated with the same target rather than
/// followed.
pub fn copy_dir(dest: &Path, src: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;

    for entry in WalkDir::new(src).follow_links(false).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        }
        // Sockets, fifos and devices are not part of a package
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dest)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
    if fs::metadata(src)?.is_dir() {
        copy_dir(dest, src)
    } else {
        fs::copy(src, dest).map(|_| ())
    }
}
