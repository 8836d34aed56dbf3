//! Archive installation: authenticate a local zip, then unpack it.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::auth::AuthenticationResult;
use crate::package::PackageMeta;
use crate::{InstallError, Result};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive entry {0:?} escapes the destination directory")]
    UnsafePath(String),
}

/// Zip extractor
pub struct ZipExtractor;

impl ZipExtractor {
    /// Extract a zip archive into `dest_dir`, creating it if needed.
    ///
    /// With `strip_top_level`, a single directory wrapping every entry is
    /// removed so its contents land directly in `dest_dir`.
    pub fn extract(
        archive_path: &Path,
        dest_dir: &Path,
        strip_top_level: bool,
    ) -> std::result::Result<(), ExtractError> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

        std::fs::create_dir_all(dest_dir)?;

        let common_prefix = if strip_top_level {
            Self::find_common_prefix(&archive)
        } else {
            None
        };

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();

            let relative = match &common_prefix {
                Some(prefix) => name.strip_prefix(prefix.as_str()).unwrap_or(&name),
                None => &name,
            };

            let relative =
                Self::sanitize(relative).ok_or_else(|| ExtractError::UnsafePath(name.clone()))?;
            if relative.as_os_str().is_empty() {
                continue;
            }

            let outpath = dest_dir.join(&relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath)?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&outpath)?;
            std::io::copy(&mut entry, &mut outfile)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    let permissions = std::fs::Permissions::from_mode(mode & 0o7777);
                    std::fs::set_permissions(&outpath, permissions)?;
                }
            }
        }

        Ok(())
    }

    /// Find the directory prefix shared by every entry (e.g. `package-1.0/`)
    fn find_common_prefix<R: Read + Seek>(archive: &zip::ZipArchive<R>) -> Option<String> {
        let first_name = archive.file_names().next()?;

        let prefix = match first_name.find('/') {
            Some(slash_pos) => &first_name[..=slash_pos],
            None => return None,
        };

        if archive.file_names().all(|name| name.starts_with(prefix)) {
            Some(prefix.to_string())
        } else {
            None
        }
    }

    /// Relative path for an entry, or `None` if it would leave the destination
    fn sanitize(relative: &str) -> Option<PathBuf> {
        let mut path = PathBuf::new();

        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        Some(path)
    }
}

/// Installs packages whose location is a zip archive on disk
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveInstaller;

impl ArchiveInstaller {
    pub fn new() -> Self {
        Self
    }

    /// Authenticate `archive` with the meta's authenticator, then unpack it
    /// into `target_dir`.
    ///
    /// Extraction overlays whatever is already in `target_dir`.
    pub async fn install(
        &self,
        meta: &PackageMeta,
        archive: &Path,
        target_dir: &Path,
    ) -> Result<Option<AuthenticationResult>> {
        let authentication = match &meta.authentication {
            Some(authenticator) => Some(
                authenticator
                    .authenticate(&meta.location)
                    .await
                    .map_err(|source| InstallError::Authentication {
                        location: meta.location.to_string(),
                        source,
                    })?,
            ),
            None => None,
        };

        log::debug!(
            "Extracting {} {} from {} into {}",
            meta.provider,
            meta.version,
            archive.display(),
            target_dir.display()
        );

        if let Err(source) = ZipExtractor::extract(archive, target_dir, true) {
            return Err(InstallError::Extraction {
                archive: archive.to_path_buf(),
                target_dir: target_dir.to_path_buf(),
                authentication,
                source,
            });
        }

        Ok(authentication)
    }
}
