// Package model for provider packages
//
// This module describes what a package is (provider, version, platform) and
// where its bytes can be found.

mod location;
mod meta;
mod provider;

pub use location::PackageLocation;
pub use meta::PackageMeta;
pub use provider::{
    InvalidPlatform, InvalidProviderAddress, Provider, TargetPlatform, DEFAULT_REGISTRY_HOST,
};
