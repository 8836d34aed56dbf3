//! File downloader for packages served as HTTP(S) zip archives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthenticationResult;
use crate::http::HttpClient;
use crate::package::PackageMeta;
use crate::{InstallError, Result};

use super::archive::ArchiveInstaller;
use super::transfer::{copy_cancellable, CopyError};

const TEMP_FILE_PREFIX: &str = "provider-";
const TEMP_FILE_SUFFIX: &str = ".zip";

/// Downloads a package archive and hands it to the [`ArchiveInstaller`]
pub struct FileDownloader {
    http_client: Arc<HttpClient>,
    archive_installer: ArchiveInstaller,
    temp_dir: Option<PathBuf>,
}

impl FileDownloader {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self {
            http_client,
            archive_installer: ArchiveInstaller::new(),
            temp_dir: None,
        }
    }

    /// Download into `dir` instead of the system temporary directory
    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = Some(dir);
        self
    }

    /// Download the archive at `url`, authenticate it and extract it into
    /// `target_dir`.
    ///
    /// The downloaded file is removed before this returns, whatever the outcome.
    pub async fn install(
        &self,
        meta: &PackageMeta,
        url: &str,
        target_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<AuthenticationResult>> {
        let request = self
            .http_client
            .build_get(url)
            .map_err(|e| InstallError::InvalidRequest {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        log::debug!("Downloading {} {} from {}", meta.provider, meta.version, url);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(InstallError::Cancelled { url: url.to_string() });
            }
            response = self.http_client.execute(request) => {
                response.map_err(|source| InstallError::Transport {
                    url: url.to_string(),
                    source,
                })?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::UnsuccessfulResponse {
                url: url.to_string(),
                status,
            });
        }
        let declared_length = response.content_length();

        let archive_file = self.create_temp_file().map_err(|source| InstallError::TempFile {
            url: url.to_string(),
            source,
        })?;
        let handle = archive_file
            .as_file()
            .try_clone()
            .map_err(|source| InstallError::TempFile {
                url: url.to_string(),
                source,
            })?;
        let mut writer = tokio::fs::File::from_std(handle);

        let body = Box::pin(response.bytes_stream());
        let copied = match copy_cancellable(body, &mut writer, cancel).await {
            Ok(copied) => copied,
            Err(CopyError::Cancelled) => {
                log::debug!("Download of {} cancelled", url);
                return Err(InstallError::Cancelled {
                    url: url.to_string(),
                });
            }
            // The connection closing before the declared length is a short
            // body, not a transport failure
            Err(CopyError::Read { copied, source }) => {
                return Err(match declared_length {
                    Some(expected) if copied < expected => {
                        log::debug!("Body of {} ended early: {}", url, source);
                        InstallError::SizeMismatch {
                            url: url.to_string(),
                            expected,
                            actual: copied,
                        }
                    }
                    _ => InstallError::Transfer {
                        url: url.to_string(),
                        source: CopyError::Read { copied, source },
                    },
                });
            }
            Err(source) => {
                return Err(InstallError::Transfer {
                    url: url.to_string(),
                    source,
                });
            }
        };
        drop(writer);

        // A truncated body would otherwise look like a complete archive
        if let Some(expected) = declared_length {
            if copied < expected {
                return Err(InstallError::SizeMismatch {
                    url: url.to_string(),
                    expected,
                    actual: copied,
                });
            }
        }

        log::debug!(
            "Downloaded {} bytes from {} to {}",
            copied,
            url,
            archive_file.path().display()
        );

        let local_meta = meta.with_local_archive(archive_file.path());

        let authentication = match &meta.authentication {
            Some(authenticator) => Some(
                authenticator
                    .authenticate(&local_meta.location)
                    .await
                    .map_err(|source| InstallError::Authentication {
                        location: url.to_string(),
                        source,
                    })?,
            ),
            None => None,
        };

        self.archive_installer
            .install(&local_meta, archive_file.path(), target_dir)
            .await
            .map_err(|e| e.with_authentication_result(authentication.clone()))?;

        Ok(authentication)
    }

    fn create_temp_file(&self) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_FILE_PREFIX).suffix(TEMP_FILE_SUFFIX);

        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::remote_meta;
    use tempfile::TempDir;

    fn downloader(temp_dir: &Path) -> FileDownloader {
        FileDownloader::new(Arc::new(HttpClient::new().unwrap()))
            .with_temp_dir(temp_dir.to_path_buf())
    }

    #[tokio::test]
    async fn test_invalid_url_is_request_error() {
        let temp = TempDir::new().unwrap();
        let meta = remote_meta("not a url");

        let err = downloader(temp.path())
            .install(&meta, "not a url", &temp.path().join("out"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let temp = TempDir::new().unwrap();
        let url = "http://127.0.0.1:9/provider.zip";
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = downloader(temp.path())
            .install(&remote_meta(url), url, &temp.path().join("out"), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_temp_file_is_created_in_configured_dir() {
        let temp = TempDir::new().unwrap();
        let file = downloader(temp.path()).create_temp_file().unwrap();

        assert!(file.path().starts_with(temp.path()));
        let name = file.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(TEMP_FILE_PREFIX));
        assert!(name.ends_with(TEMP_FILE_SUFFIX));
    }
}
