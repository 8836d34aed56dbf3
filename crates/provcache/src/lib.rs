pub mod auth;
pub mod cache;
pub mod downloader;
pub mod error;
pub mod http;
pub mod installer;
pub mod package;

#[cfg(test)]
mod test_support;

pub use auth::{AuthenticationResult, PackageAuthenticator};
pub use cache::CacheDir;
pub use downloader::{LinkMode, PathInstallResult, PathStrategy};
pub use error::{InstallError, Result};
pub use http::{HttpClient, HttpClientConfig};
pub use installer::{InstallConfig, PackageInstaller};
pub use package::{PackageLocation, PackageMeta, Provider, TargetPlatform};
