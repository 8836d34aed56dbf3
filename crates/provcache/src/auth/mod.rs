//! Package authentication.
//!
//! An authenticator inspects the bytes of a package on disk and reports how
//! trust in them was established. The installers only ever pass the
//! [`AuthenticationResult`] through to their caller.

mod all;
mod checksum;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::package::PackageLocation;

pub use all::AllAuthenticators;
pub use checksum::{
    compute_checksum, ArchiveChecksumAuthenticator, ChecksumType, MatchingHashAuthenticator,
    ZIP_HASH_PREFIX,
};

/// Verifies a package that is available on disk
#[async_trait]
pub trait PackageAuthenticator: fmt::Debug + Send + Sync {
    async fn authenticate(
        &self,
        location: &PackageLocation,
    ) -> Result<AuthenticationResult, AuthenticationFailure>;
}

/// How trust in a package was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationKind {
    /// The archive matched an expected checksum
    VerifiedChecksum,
    /// The archive hash was among a set of previously recorded hashes
    MatchingHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResult {
    kind: AuthenticationKind,
}

impl AuthenticationResult {
    pub fn new(kind: AuthenticationKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> AuthenticationKind {
        self.kind
    }
}

impl fmt::Display for AuthenticationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AuthenticationKind::VerifiedChecksum => f.write_str("verified checksum"),
            AuthenticationKind::MatchingHash => f.write_str("matching hash"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("cannot authenticate {location}: only local archives can be verified")]
    UnsupportedLocation { location: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported checksum format: {0:?}")]
    InvalidChecksum(String),

    #[error("archive {} has checksum {actual}, expected {expected}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("archive {} has hash {actual}, which is not one of the {allowed} allowed hashes", path.display())]
    NoMatchingHash {
        path: PathBuf,
        actual: String,
        allowed: usize,
    },

    #[error("no authenticators configured")]
    NoAuthenticators,
}

/// Failed authentication, with whatever was learned before it failed
#[derive(Debug, Error)]
#[error("{error}")]
pub struct AuthenticationFailure {
    pub partial: Option<AuthenticationResult>,
    pub error: AuthenticationError,
}

impl From<AuthenticationError> for AuthenticationFailure {
    fn from(error: AuthenticationError) -> Self {
        Self {
            partial: None,
            error,
        }
    }
}
