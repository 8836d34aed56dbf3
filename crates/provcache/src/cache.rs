use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::AuthenticationResult;
use crate::downloader::PathInstallResult;
use crate::installer::PackageInstaller;
use crate::package::{PackageMeta, Provider, TargetPlatform};
use crate::Result;

/// On-disk cache of unpacked provider packages
///
/// Layout: `<base>/<hostname>/<namespace>/<type>/<version>/<os>_<arch>`
#[derive(Clone)]
pub struct CacheDir {
    /// Root directory of the cache
    base_dir: PathBuf,
    /// Platform whose packages this cache holds
    platform: TargetPlatform,
    installer: Arc<PackageInstaller>,
}

impl CacheDir {
    /// Create a new cache rooted at `base_dir`
    ///
    /// # Example
    /// ```no_run
    /// use std::path::PathBuf;
    /// use std::sync::Arc;
    /// use provcache::cache::CacheDir;
    /// use provcache::http::HttpClient;
    /// use provcache::installer::{InstallConfig, PackageInstaller};
    /// use provcache::package::TargetPlatform;
    ///
    /// let client = Arc::new(HttpClient::new().unwrap());
    /// let installer = Arc::new(PackageInstaller::new(client, InstallConfig::default()));
    /// let base = PathBuf::from("/tmp/plugins");
    /// let cache = CacheDir::new(base, TargetPlatform::current(), installer);
    /// ```
    pub fn new(
        base_dir: PathBuf,
        platform: TargetPlatform,
        installer: Arc<PackageInstaller>,
    ) -> Self {
        Self {
            base_dir,
            platform,
            installer,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn platform(&self) -> &TargetPlatform {
        &self.platform
    }

    /// Directory holding the unpacked package for `provider` at `version`
    pub fn package_dir(&self, provider: &Provider, version: &str) -> PathBuf {
        self.base_dir
            .join(&provider.hostname)
            .join(&provider.namespace)
            .join(&provider.provider_type)
            .join(version)
            .join(self.platform.to_string())
    }

    /// Whether the cache already holds an unpacked copy of the package
    pub fn contains(&self, provider: &Provider, version: &str) -> bool {
        self.package_dir(provider, version).is_dir()
    }

    /// Install a package into its slot in this cache
    pub async fn install_package(
        &self,
        meta: &PackageMeta,
        cancel: &CancellationToken,
    ) -> Result<Option<AuthenticationResult>> {
        if meta.target_platform != self.platform {
            log::warn!(
                "Installing {} {} built for {} into a cache for {}",
                meta.provider,
                meta.version,
                meta.target_platform,
                self.platform
            );
        }

        let target_dir = self.package_dir(&meta.provider, &meta.version);
        log::info!(
            "Installing {} {} into {}",
            meta.provider,
            meta.version,
            target_dir.display()
        );

        self.installer.install(meta, &target_dir, cancel).await
    }

    /// Populate this cache with a package already unpacked in `other`
    pub fn link_from_other_cache(
        &self,
        other: &CacheDir,
        provider: &Provider,
        version: &str,
    ) -> Result<PathInstallResult> {
        let source_dir = other.package_dir(provider, version);
        let target_dir = self.package_dir(provider, version);
        log::info!(
            "Linking {} {} from {}",
            provider,
            version,
            other.base_dir.display()
        );

        self.installer.link(&source_dir, &target_dir)
    }
}

impl std::fmt::Debug for CacheDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheDir")
            .field("base_dir", &self.base_dir)
            .field("platform", &self.platform)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::{LinkMode, PathStrategy};
    use crate::http::HttpClient;
    use crate::installer::InstallConfig;
    use crate::package::PackageLocation;
    use crate::test_support::{meta_for, write_zip};
    use crate::InstallError;
    use tempfile::TempDir;

    fn cache(base: &Path, link_mode: LinkMode) -> CacheDir {
        let installer = PackageInstaller::new(
            Arc::new(HttpClient::new().unwrap()),
            InstallConfig {
                link_mode,
                ..Default::default()
            },
        );
        CacheDir::new(
            base.to_path_buf(),
            TargetPlatform::new("linux", "amd64"),
            Arc::new(installer),
        )
    }

    fn null_provider() -> Provider {
        Provider::new("registry.terraform.io", "hashicorp", "null")
    }

    #[test]
    fn test_package_dir_layout() {
        let cache = cache(Path::new("/plugins"), LinkMode::default());

        assert_eq!(
            cache.package_dir(&null_provider(), "3.2.1"),
            PathBuf::from("/plugins/registry.terraform.io/hashicorp/null/3.2.1/linux_amd64")
        );
    }

    #[tokio::test]
    async fn test_install_package_into_slot() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("p.zip");
        write_zip(&archive, &[("terraform-provider-null", b"bin")]);
        let cache = cache(&temp.path().join("plugins"), LinkMode::default());
        let meta = meta_for(PackageLocation::LocalArchive(archive));

        let result = cache
            .install_package(&meta, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(cache.contains(&null_provider(), "3.2.1"));
        assert!(cache
            .package_dir(&null_provider(), "3.2.1")
            .join("terraform-provider-null")
            .is_file());
    }

    #[tokio::test]
    async fn test_link_from_other_cache() {
        let temp = TempDir::new().unwrap();
        let shared = cache(&temp.path().join("shared"), LinkMode::default());
        let local = cache(&temp.path().join("local"), LinkMode::CopyOnly);
        let source = shared.package_dir(&null_provider(), "3.2.1");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("terraform-provider-null"), b"bin").unwrap();

        let result = local
            .link_from_other_cache(&shared, &null_provider(), "3.2.1")
            .unwrap();

        assert_eq!(result.strategy, PathStrategy::Copy);
        assert!(local
            .package_dir(&null_provider(), "3.2.1")
            .join("terraform-provider-null")
            .is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_link_back_into_origin_cache_is_rejected() {
        let temp = TempDir::new().unwrap();
        let local = cache(&temp.path().join("local"), LinkMode::default());
        let shared = cache(&temp.path().join("shared"), LinkMode::default());
        let origin = local.package_dir(&null_provider(), "3.2.1");
        std::fs::create_dir_all(&origin).unwrap();
        std::fs::write(origin.join("terraform-provider-null"), b"bin").unwrap();
        shared
            .link_from_other_cache(&local, &null_provider(), "3.2.1")
            .unwrap();

        let err = local
            .link_from_other_cache(&shared, &null_provider(), "3.2.1")
            .unwrap_err();

        assert!(matches!(err, InstallError::SelfInstall { .. }));
        assert!(!origin.is_symlink());
        assert_eq!(std::fs::read(origin.join("terraform-provider-null")).unwrap(), b"bin");
    }

    #[test]
    fn test_link_from_itself_is_rejected() {
        let temp = TempDir::new().unwrap();
        let cache = cache(temp.path(), LinkMode::default());
        std::fs::create_dir_all(cache.package_dir(&null_provider(), "3.2.1")).unwrap();

        let err = cache
            .link_from_other_cache(&cache, &null_provider(), "3.2.1")
            .unwrap_err();

        assert!(matches!(err, InstallError::SelfInstall { .. }));
    }
}
