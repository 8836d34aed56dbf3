//! Link command - reuse a package already unpacked in another cache.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use provcache::{CacheDir, HttpClient, PackageInstaller, PathStrategy, Provider, TargetPlatform};

use crate::config::ProvcacheConfig;

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Cache directory that already holds the package
    pub source_cache: PathBuf,

    /// Cache directory to populate
    pub target_cache: PathBuf,

    /// Provider address ([hostname/]namespace/type)
    pub provider: Provider,

    /// Provider version
    pub version: String,

    /// Target platform (os_arch), defaults to the running host
    #[arg(long)]
    pub platform: Option<TargetPlatform>,

    /// Copy instead of symlinking
    #[arg(long)]
    pub copy: bool,
}

pub fn execute(args: LinkArgs, config: &ProvcacheConfig) -> Result<u8> {
    let platform = args.platform.unwrap_or_else(TargetPlatform::current);
    let http_client = Arc::new(
        HttpClient::with_config(config.http_client_config())
            .context("Failed to create HTTP client")?,
    );
    let installer = Arc::new(PackageInstaller::new(http_client, config.install_config(args.copy)));

    let source = CacheDir::new(args.source_cache, platform.clone(), installer.clone());
    let target = CacheDir::new(args.target_cache, platform, installer);

    let result = target
        .link_from_other_cache(&source, &args.provider, &args.version)
        .with_context(|| format!("Failed to link {} {}", args.provider, args.version))?;

    let verb = match result.strategy {
        PathStrategy::Symlink => "Linked",
        PathStrategy::Copy => "Copied",
    };
    println!(
        "{} {} {} to {}",
        style(verb).green().bold(),
        args.provider,
        args.version,
        result.path.display()
    );

    Ok(0)
}
