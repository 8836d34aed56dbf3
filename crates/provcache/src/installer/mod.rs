//! Package installation.
//!
//! This module is the single entry point for materializing a package into a
//! target directory, whatever kind of location it comes from.

mod manager;

pub use manager::{InstallConfig, PackageInstaller};
