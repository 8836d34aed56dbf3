//! Checksum verification for downloaded archives.

use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256, Sha512};
use tokio::io::AsyncReadExt;

use crate::package::PackageLocation;

use super::{
    AuthenticationError, AuthenticationFailure, AuthenticationKind, AuthenticationResult,
    PackageAuthenticator,
};

/// Prefix of archive hashes recorded in lock files
pub const ZIP_HASH_PREFIX: &str = "zh:";

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Supported checksum types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumType {
    Sha256,
    Sha512,
}

impl ChecksumType {
    /// Detect checksum type from length of hex string
    pub fn from_hex_length(len: usize) -> Option<Self> {
        match len {
            64 => Some(ChecksumType::Sha256),
            128 => Some(ChecksumType::Sha512),
            _ => None,
        }
    }
}

/// Compute the lowercase hex checksum of a file
pub async fn compute_checksum(path: &Path, checksum_type: ChecksumType) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    match checksum_type {
        ChecksumType::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let n = file.read(&mut buffer).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buffer[..n]);
            }
            Ok(format!("{:x}", hasher.finalize()))
        }
        ChecksumType::Sha512 => {
            let mut hasher = Sha512::new();
            loop {
                let n = file.read(&mut buffer).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buffer[..n]);
            }
            Ok(format!("{:x}", hasher.finalize()))
        }
    }
}

fn local_archive(location: &PackageLocation) -> Result<&Path, AuthenticationError> {
    match location {
        PackageLocation::LocalArchive(path) => Ok(path),
        other => Err(AuthenticationError::UnsupportedLocation {
            location: other.to_string(),
        }),
    }
}

async fn archive_checksum(
    path: &Path,
    checksum_type: ChecksumType,
) -> Result<String, AuthenticationError> {
    compute_checksum(path, checksum_type)
        .await
        .map_err(|source| AuthenticationError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Accepts an archive whose checksum equals one expected value
#[derive(Debug, Clone)]
pub struct ArchiveChecksumAuthenticator {
    expected: String,
    checksum_type: ChecksumType,
}

impl ArchiveChecksumAuthenticator {
    /// The checksum type is inferred from the length of `expected`.
    pub fn new(expected: impl Into<String>) -> Result<Self, AuthenticationError> {
        let expected = expected.into();
        let checksum_type = ChecksumType::from_hex_length(expected.len())
            .filter(|_| expected.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| AuthenticationError::InvalidChecksum(expected.clone()))?;

        Ok(Self {
            expected: expected.to_ascii_lowercase(),
            checksum_type,
        })
    }

    pub fn checksum_type(&self) -> ChecksumType {
        self.checksum_type
    }
}

#[async_trait]
impl PackageAuthenticator for ArchiveChecksumAuthenticator {
    async fn authenticate(
        &self,
        location: &PackageLocation,
    ) -> Result<AuthenticationResult, AuthenticationFailure> {
        let path = local_archive(location)?;
        let actual = archive_checksum(path, self.checksum_type).await?;

        if actual != self.expected {
            return Err(AuthenticationError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: self.expected.clone(),
                actual,
            }
            .into());
        }

        log::debug!("Checksum of {} verified", path.display());
        Ok(AuthenticationResult::new(AuthenticationKind::VerifiedChecksum))
    }
}

/// Accepts an archive whose `zh:` hash is one of a set of recorded hashes
#[derive(Debug, Clone)]
pub struct MatchingHashAuthenticator {
    allowed: Vec<String>,
}

impl MatchingHashAuthenticator {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|hash| hash.into().to_ascii_lowercase())
                .collect(),
        }
    }
}

#[async_trait]
impl PackageAuthenticator for MatchingHashAuthenticator {
    async fn authenticate(
        &self,
        location: &PackageLocation,
    ) -> Result<AuthenticationResult, AuthenticationFailure> {
        let path = local_archive(location)?;
        let actual = format!(
            "{}{}",
            ZIP_HASH_PREFIX,
            archive_checksum(path, ChecksumType::Sha256).await?
        );

        if !self.allowed.iter().any(|hash| *hash == actual) {
            return Err(AuthenticationError::NoMatchingHash {
                path: path.to_path_buf(),
                actual,
                allowed: self.allowed.len(),
            }
            .into());
        }

        Ok(AuthenticationResult::new(AuthenticationKind::MatchingHash))
    }
}
