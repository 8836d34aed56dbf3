//! Installation manager - dispatches a package to the installer for its location.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::AuthenticationResult;
use crate::downloader::{
    ArchiveInstaller, FileDownloader, LinkMode, PathDownloader, PathInstallResult,
};
use crate::http::HttpClient;
use crate::package::{PackageLocation, PackageMeta};
use crate::Result;

/// Installation configuration
#[derive(Debug, Clone, Default)]
pub struct InstallConfig {
    /// How directory packages are materialized
    pub link_mode: LinkMode,
    /// Directory for downloaded archives (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
}

/// Installs a package from any supported location
pub struct PackageInstaller {
    file_downloader: FileDownloader,
    archive_installer: ArchiveInstaller,
    path_downloader: PathDownloader,
}

impl PackageInstaller {
    pub fn new(http_client: Arc<HttpClient>, config: InstallConfig) -> Self {
        let mut file_downloader = FileDownloader::new(http_client);
        if let Some(temp_dir) = config.temp_dir {
            file_downloader = file_downloader.with_temp_dir(temp_dir);
        }

        Self {
            file_downloader,
            archive_installer: ArchiveInstaller::new(),
            path_downloader: PathDownloader::with_link_mode(config.link_mode),
        }
    }

    /// Install the package described by `meta` into `target_dir`.
    ///
    /// Returns how the package was authenticated, or `None` when no
    /// authenticator was configured or the location is a directory.
    /// Only the network transfer observes `cancel`.
    pub async fn install(
        &self,
        meta: &PackageMeta,
        target_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<AuthenticationResult>> {
        match &meta.location {
            PackageLocation::RemoteArchive(url) => {
                self.file_downloader
                    .install(meta, url, target_dir, cancel)
                    .await
            }
            PackageLocation::LocalArchive(archive) => {
                self.archive_installer
                    .install(meta, archive, target_dir)
                    .await
            }
            PackageLocation::LocalDirectory(source_dir) => {
                log::debug!(
                    "Installing {} {} from {}",
                    meta.provider,
                    meta.version,
                    source_dir.display()
                );
                self.path_downloader.install(source_dir, target_dir)?;
                Ok(None)
            }
        }
    }

    /// Link (or copy) an unpacked package directory to another location
    pub fn link(&self, source_dir: &Path, target_dir: &Path) -> Result<PathInstallResult> {
        self.path_downloader.install(source_dir, target_dir)
    }
}
