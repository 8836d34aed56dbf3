//! Shared fixtures for unit tests.

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use zip::write::SimpleFileOptions;

use crate::auth::{
    AuthenticationError, AuthenticationFailure, AuthenticationKind, AuthenticationResult,
    PackageAuthenticator,
};
use crate::package::{PackageLocation, PackageMeta, Provider, TargetPlatform};

/// Build a zip in memory; names ending in `/` become directories.
pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for (name, data) in entries {
        let options = SimpleFileOptions::default();
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }

    writer.finish().unwrap().into_inner()
}

pub(crate) fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    std::fs::write(path, build_zip(entries)).unwrap();
}

pub(crate) fn write_zip_with_mode(path: &Path, name: &str, data: &[u8], mode: u32) {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().unix_permissions(mode);
    writer.start_file(name, options).unwrap();
    writer.write_all(data).unwrap();
    std::fs::write(path, writer.finish().unwrap().into_inner()).unwrap();
}

pub(crate) fn meta_for(location: PackageLocation) -> PackageMeta {
    PackageMeta::new(
        Provider::new("registry.terraform.io", "hashicorp", "null"),
        "3.2.1",
        TargetPlatform::new("linux", "amd64"),
        "terraform-provider-null_3.2.1_linux_amd64.zip",
        location,
    )
}

pub(crate) fn remote_meta(url: &str) -> PackageMeta {
    meta_for(PackageLocation::RemoteArchive(url.to_string()))
}

/// Authenticator with a fixed outcome that counts its invocations
#[derive(Debug)]
pub(crate) struct StaticAuthenticator {
    outcome: Result<AuthenticationKind, Option<AuthenticationKind>>,
    calls: AtomicUsize,
}

impl StaticAuthenticator {
    pub(crate) fn succeeding() -> Self {
        Self::succeeding_with(AuthenticationKind::VerifiedChecksum)
    }

    pub(crate) fn succeeding_with(kind: AuthenticationKind) -> Self {
        Self {
            outcome: Ok(kind),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            outcome: Err(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_with_partial(kind: AuthenticationKind) -> Self {
        Self {
            outcome: Err(Some(kind)),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageAuthenticator for StaticAuthenticator {
    async fn authenticate(
        &self,
        location: &PackageLocation,
    ) -> Result<AuthenticationResult, AuthenticationFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.outcome {
            Ok(kind) => Ok(AuthenticationResult::new(kind)),
            Err(partial) => Err(AuthenticationFailure {
                partial: partial.map(AuthenticationResult::new),
                error: AuthenticationError::ChecksumMismatch {
                    path: location.local_path().unwrap_or(Path::new("")).to_path_buf(),
                    expected: "0".repeat(64),
                    actual: "f".repeat(64),
                },
            }),
        }
    }
}
