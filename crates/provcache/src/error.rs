use std::path::PathBuf;

use thiserror::Error;

use crate::auth::{AuthenticationFailure, AuthenticationResult};
use crate::downloader::{CopyError, ExtractError};

#[derive(Error, Debug)]
pub enum InstallError {
    // Network stage
    #[error("invalid provider download request for {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    #[error("failed to request {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unsuccessful request to {url}: {status}")]
    UnsuccessfulResponse {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to open temporary file to download from {url}: {source}")]
    TempFile {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download {url}: {source}")]
    Transfer {
        url: String,
        #[source]
        source: CopyError,
    },

    #[error("download of {url} was cancelled")]
    Cancelled { url: String },

    #[error("incorrect response size from {url}: expected {expected} bytes, but got {actual} bytes")]
    SizeMismatch { url: String, expected: u64, actual: u64 },

    // Authentication
    #[error("failed to authenticate package from {location}: {source}")]
    Authentication {
        location: String,
        #[source]
        source: AuthenticationFailure,
    },

    // Archive stage
    #[error("failed to extract {} into {}: {source}", archive.display(), target_dir.display())]
    Extraction {
        archive: PathBuf,
        target_dir: PathBuf,
        /// Result of the authentication that ran before extraction, if any.
        authentication: Option<AuthenticationResult>,
        #[source]
        source: ExtractError,
    },

    // Directory stage
    #[error("failed to resolve {}: {source}", path.display())]
    PathResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot install existing provider directory {} to itself", target_dir.display())]
    SelfInstall { target_dir: PathBuf },

    #[error("failed to remove existing {} before linking {} into it: {source}", target_dir.display(), source_dir.display())]
    Removal {
        source_dir: PathBuf,
        target_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create parent directories leading to {}: {source}", target_dir.display())]
    CreateParent {
        target_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to either symlink or copy {} to {}: {source}", source_dir.display(), target_dir.display())]
    Install {
        source_dir: PathBuf,
        target_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    /// Authentication outcome that was established before the install failed.
    ///
    /// For authentication failures this is the partial result reported by the
    /// authenticator; for extraction failures it is the full result of the
    /// authentication that succeeded before extraction started.
    pub fn authentication_result(&self) -> Option<&AuthenticationResult> {
        match self {
            InstallError::Authentication { source, .. } => source.partial.as_ref(),
            InstallError::Extraction { authentication, .. } => authentication.as_ref(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, InstallError::Cancelled { .. })
    }

    /// Replace the authentication result carried by an extraction error.
    pub(crate) fn with_authentication_result(self, result: Option<AuthenticationResult>) -> Self {
        match self {
            InstallError::Extraction {
                archive,
                target_dir,
                source,
                ..
            } => InstallError::Extraction {
                archive,
                target_dir,
                authentication: result,
                source,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticationError, AuthenticationKind};

    #[test]
    fn test_authentication_result_from_failure() {
        let err = InstallError::Authentication {
            location: "https://example.com/p.zip".to_string(),
            source: AuthenticationFailure {
                partial: Some(AuthenticationResult::new(AuthenticationKind::VerifiedChecksum)),
                error: AuthenticationError::NoAuthenticators,
            },
        };

        assert_eq!(
            err.authentication_result().map(|r| r.kind()),
            Some(AuthenticationKind::VerifiedChecksum)
        );
    }

    #[test]
    fn test_with_authentication_result_only_touches_extraction() {
        let result = Some(AuthenticationResult::new(AuthenticationKind::MatchingHash));

        let err = InstallError::Extraction {
            archive: PathBuf::from("/tmp/p.zip"),
            target_dir: PathBuf::from("/tmp/out"),
            authentication: None,
            source: ExtractError::UnsafePath("../x".to_string()),
        }
        .with_authentication_result(result.clone());
        assert_eq!(err.authentication_result(), result.as_ref());

        let err = InstallError::SelfInstall {
            target_dir: PathBuf::from("/tmp/out"),
        }
        .with_authentication_result(result);
        assert!(err.authentication_result().is_none());
    }

    #[test]
    fn test_messages_name_locations() {
        let err = InstallError::SizeMismatch {
            url: "https://example.com/p.zip".to_string(),
            expected: 100,
            actual: 10,
        };
        assert_eq!(
            err.to_string(),
            "incorrect response size from https://example.com/p.zip: expected 100 bytes, but got 10 bytes"
        );

        let err = InstallError::SelfInstall {
            target_dir: PathBuf::from("/cache/p"),
        };
        assert_eq!(
            err.to_string(),
            "cannot install existing provider directory /cache/p to itself"
        );
    }
}
