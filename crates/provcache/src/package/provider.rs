use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry host assumed when a provider address omits it
pub const DEFAULT_REGISTRY_HOST: &str = "registry.terraform.io";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid provider address {0:?}: expected [hostname/]namespace/type")]
pub struct InvalidProviderAddress(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid target platform {0:?}: expected os_arch")]
pub struct InvalidPlatform(pub String);

/// Fully qualified provider identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provider {
    pub hostname: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub provider_type: String,
}

impl Provider {
    pub fn new(
        hostname: impl Into<String>,
        namespace: impl Into<String>,
        provider_type: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            namespace: namespace.into(),
            provider_type: provider_type.into(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.hostname, self.namespace, self.provider_type)
    }
}

impl FromStr for Provider {
    type Err = InvalidProviderAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(InvalidProviderAddress(s.to_string()));
        }

        match parts.as_slice() {
            [namespace, provider_type] => {
                Ok(Self::new(DEFAULT_REGISTRY_HOST, *namespace, *provider_type))
            }
            [hostname, namespace, provider_type] => {
                Ok(Self::new(*hostname, *namespace, *provider_type))
            }
            _ => Err(InvalidProviderAddress(s.to_string())),
        }
    }
}

/// Operating system and architecture a package was built for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetPlatform {
    pub os: String,
    pub arch: String,
}

impl TargetPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Platform of the running host, using registry naming (`darwin`, `amd64`, ...)
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };
        Self::new(os, arch)
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}

impl FromStr for TargetPlatform {
    type Err = InvalidPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('_') {
            Some((os, arch)) if !os.is_empty() && !arch.is_empty() && !arch.contains('_') => {
                Ok(Self::new(os, arch))
            }
            _ => Err(InvalidPlatform(s.to_string())),
        }
    }
}
