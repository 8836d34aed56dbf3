//! Install command - install a single provider package.

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use provcache::{
    auth::{
        AllAuthenticators, ArchiveChecksumAuthenticator, MatchingHashAuthenticator,
        PackageAuthenticator,
    },
    AuthenticationResult, CacheDir, HttpClient, PackageInstaller, PackageLocation, PackageMeta,
    Provider, TargetPlatform,
};

use crate::config::ProvcacheConfig;

/// Exit status after Ctrl-C, as a shell reports SIGINT
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Package location: an http(s) URL, a .zip file or an unpacked directory
    pub location: String,

    /// Directory to install into (defaults to the package's slot in the cache directory)
    pub target: Option<PathBuf>,

    /// Expected SHA-256 (or SHA-512) checksum of the archive
    #[arg(long, alias = "checksum", value_name = "HEX")]
    pub sha256: Option<String>,

    /// Accepted `zh:` package hash (can be used multiple times)
    #[arg(long = "hash", value_name = "HASH", action = clap::ArgAction::Append)]
    pub hashes: Vec<String>,

    /// Provider address ([hostname/]namespace/type)
    #[arg(long, default_value = "local/provider")]
    pub provider: Provider,

    /// Provider version
    #[arg(long = "provider-version", default_value = "0.0.0")]
    pub version: String,

    /// Target platform (os_arch), defaults to the running host
    #[arg(long)]
    pub platform: Option<TargetPlatform>,

    /// Cache directory used when no target is given
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Copy directory packages instead of symlinking them
    #[arg(long)]
    pub copy: bool,
}

pub async fn execute(args: InstallArgs, config: &ProvcacheConfig) -> Result<u8> {
    let location = detect_location(&args.location)?;
    let platform = args.platform.clone().unwrap_or_else(TargetPlatform::current);

    let filename = file_name(&location);
    let mut meta = PackageMeta::new(
        args.provider.clone(),
        args.version.clone(),
        platform.clone(),
        filename,
        location,
    );
    if let Some(authenticator) = build_authenticator(&args)? {
        meta = meta.with_authentication(authenticator);
    }

    let http_client = Arc::new(
        HttpClient::with_config(config.http_client_config())
            .context("Failed to create HTTP client")?,
    );
    let installer = Arc::new(PackageInstaller::new(http_client, config.install_config(args.copy)));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling install");
            trigger.cancel();
        }
    });

    println!(
        "{} {} {} ({})",
        style("Installing").green().bold(),
        meta.provider,
        meta.version,
        meta.location
    );

    let result = match &args.target {
        Some(target) => installer
            .install(&meta, target, &cancel)
            .await
            .map(|auth| (target.clone(), auth)),
        None => {
            let cache_dir = args
                .cache_dir
                .clone()
                .or_else(|| config.install.cache_dir.clone())
                .context("No target directory given and no cache_dir configured")?;
            let cache = CacheDir::new(cache_dir, platform, installer.clone());
            let target = cache.package_dir(&meta.provider, &meta.version);
            cache.install_package(&meta, &cancel).await.map(|auth| (target, auth))
        }
    };
    ctrl_c.abort();

    match result {
        Ok((target, authentication)) => {
            println!(
                "{} {} into {}",
                style("Installed").green().bold(),
                meta.provider,
                target.display()
            );
            print_authentication(authentication.as_ref());
            Ok(0)
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("{} Install cancelled", style("Warning:").yellow());
            Ok(EXIT_CANCELLED)
        }
        Err(e) => {
            if let Some(partial) = e.authentication_result() {
                print_authentication(Some(partial));
            }
            Err(e).context(format!("Failed to install {} {}", meta.provider, meta.version))
        }
    }
}

fn print_authentication(authentication: Option<&AuthenticationResult>) {
    match authentication {
        Some(result) => println!("  {} {}", style("Authenticated:").cyan(), result),
        None => println!("  {} not authenticated", style("Authenticated:").cyan()),
    }
}

/// Work out what kind of location `input` names
pub fn detect_location(input: &str) -> Result<PackageLocation> {
    if input.starts_with("http://") || input.starts_with("https://") {
        return Ok(PackageLocation::RemoteArchive(input.to_string()));
    }

    let path = PathBuf::from(input);
    if path.is_dir() {
        return Ok(PackageLocation::LocalDirectory(path));
    }

    let is_zip = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
    if is_zip {
        if !path.is_file() {
            bail!("Archive {} does not exist", path.display());
        }
        return Ok(PackageLocation::LocalArchive(path));
    }

    bail!(
        "Cannot determine package location for {:?}: expected an http(s) URL, a .zip file or a directory",
        input
    )
}

fn file_name(location: &PackageLocation) -> String {
    let name = match location {
        PackageLocation::RemoteArchive(url) => url.rsplit('/').next().map(str::to_string),
        PackageLocation::LocalArchive(path) | PackageLocation::LocalDirectory(path) => {
            Path::new(path).file_name().map(|n| n.to_string_lossy().to_string())
        }
    };
    name.unwrap_or_default()
}

fn build_authenticator(args: &InstallArgs) -> Result<Option<Arc<dyn PackageAuthenticator>>> {
    let mut authenticators: Vec<Arc<dyn PackageAuthenticator>> = Vec::new();

    if !args.hashes.is_empty() {
        authenticators.push(Arc::new(MatchingHashAuthenticator::new(args.hashes.iter().cloned())));
    }
    if let Some(checksum) = &args.sha256 {
        let authenticator = ArchiveChecksumAuthenticator::new(checksum.clone())
            .context("Invalid --sha256 value")?;
        authenticators.push(Arc::new(authenticator));
    }

    Ok(match authenticators.len() {
        0 => None,
        1 => authenticators.pop(),
        _ => Some(Arc::new(AllAuthenticators::new(authenticators))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_remote_location() {
        let location = detect_location("https://releases.example.com/p.zip").unwrap();
        assert_eq!(
            location,
            PackageLocation::RemoteArchive("https://releases.example.com/p.zip".to_string())
        );
    }

    #[test]
    fn test_detect_local_locations() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("p.zip");
        std::fs::write(&archive, b"PK").unwrap();

        assert_eq!(
            detect_location(archive.to_str().unwrap()).unwrap(),
            PackageLocation::LocalArchive(archive.clone())
        );
        assert_eq!(
            detect_location(temp.path().to_str().unwrap()).unwrap(),
            PackageLocation::LocalDirectory(temp.path().to_path_buf())
        );
    }

    #[test]
    fn test_detect_rejects_unknown_locations() {
        let temp = TempDir::new().unwrap();

        assert!(detect_location(temp.path().join("missing.zip").to_str().unwrap()).is_err());
        assert!(detect_location("ftp://example.com/p.zip").is_err());
    }

    #[test]
    fn test_cancelled_exit_status_is_sigint() {
        assert_eq!(EXIT_CANCELLED as i32, 128 + 2);
    }

    #[test]
    fn test_file_name_from_location() {
        assert_eq!(
            file_name(&PackageLocation::RemoteArchive(
                "https://example.com/dl/terraform-provider-null_3.2.1_linux_amd64.zip".to_string()
            )),
            "terraform-provider-null_3.2.1_linux_amd64.zip"
        );
        assert_eq!(
            file_name(&PackageLocation::LocalDirectory(PathBuf::from("/cache/null"))),
            "null"
        );
    }
}
