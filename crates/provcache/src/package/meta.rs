use std::path::Path;
use std::sync::Arc;

use crate::auth::PackageAuthenticator;

use super::{PackageLocation, Provider, TargetPlatform};

/// Everything needed to install one package.
///
/// Built by whoever resolved the package and consumed read-only by the
/// installers.
#[derive(Debug, Clone)]
pub struct PackageMeta {
    pub provider: Provider,
    pub version: String,
    pub protocol_versions: Vec<String>,
    pub target_platform: TargetPlatform,
    pub filename: String,
    pub location: PackageLocation,

    /// Verification to run against the package bytes before they are used
    pub authentication: Option<Arc<dyn PackageAuthenticator>>,
}

impl PackageMeta {
    pub fn new(
        provider: Provider,
        version: impl Into<String>,
        target_platform: TargetPlatform,
        filename: impl Into<String>,
        location: PackageLocation,
    ) -> Self {
        Self {
            provider,
            version: version.into(),
            protocol_versions: Vec::new(),
            target_platform,
            filename: filename.into(),
            location,
            authentication: None,
        }
    }

    pub fn with_protocol_versions(mut self, versions: Vec<String>) -> Self {
        self.protocol_versions = versions;
        self
    }

    pub fn with_authentication(mut self, authenticator: Arc<dyn PackageAuthenticator>) -> Self {
        self.authentication = Some(authenticator);
        self
    }

    /// Copy of this descriptor pointing at a downloaded archive.
    ///
    /// The copy never carries the authenticator: whoever downloaded the
    /// archive has already authenticated it.
    pub fn with_local_archive(&self, archive: &Path) -> Self {
        Self {
            provider: self.provider.clone(),
            version: self.version.clone(),
            protocol_versions: self.protocol_versions.clone(),
            target_platform: self.target_platform.clone(),
            filename: self.filename.clone(),
            location: PackageLocation::LocalArchive(archive.to_path_buf()),
            authentication: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{remote_meta, StaticAuthenticator};

    #[test]
    fn test_with_local_archive_drops_authenticator() {
        let meta = remote_meta("https://example.com/p.zip")
            .with_protocol_versions(vec!["5.0".to_string()])
            .with_authentication(Arc::new(StaticAuthenticator::succeeding()));

        let local = meta.with_local_archive(Path::new("/tmp/provider-123.zip"));

        assert!(local.authentication.is_none());
        assert_eq!(
            local.location,
            PackageLocation::LocalArchive("/tmp/provider-123.zip".into())
        );
        assert_eq!(local.provider, meta.provider);
        assert_eq!(local.version, meta.version);
        assert_eq!(local.protocol_versions, vec!["5.0".to_string()]);
        assert_eq!(local.filename, meta.filename);

        // The original is left as it was
        assert!(meta.authentication.is_some());
        assert!(meta.location.is_remote());
    }
}
