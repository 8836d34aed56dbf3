use anyhow::{Context, Result};
use provcache::{HttpClientConfig, InstallConfig, LinkMode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "provcache.toml";

/// The provcache configuration file structure (provcache.toml)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProvcacheConfig {
    /// HTTP client settings
    pub http: HttpConfig,

    /// Installation settings
    pub install: InstallSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Overall request timeout in seconds
    pub timeout: Option<u64>,

    /// Connect timeout in seconds
    pub connect_timeout: Option<u64>,

    pub user_agent: Option<String>,

    /// Proxy URL used for all requests
    pub proxy: Option<String>,

    /// Extra CA certificate (PEM)
    pub cafile: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// `symlink-or-copy` or `copy-only`
    pub link_mode: Option<LinkMode>,

    /// Where downloaded archives are staged
    pub temp_dir: Option<PathBuf>,

    /// Default plugin cache directory
    pub cache_dir: Option<PathBuf>,
}

impl ProvcacheConfig {
    /// Load configuration from provcache.toml, searching upward from the given directory
    pub fn load(start_dir: &Path) -> Result<Option<Self>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE);

            if config_path.exists() {
                let content = std::fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read {}", config_path.display()))?;
                let config: ProvcacheConfig = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse {}", config_path.display()))?;
                log::debug!("Loaded configuration from {}", config_path.display());
                return Ok(Some(config));
            }

            if !current.pop() {
                return Ok(None);
            }
        }
    }

    /// Load configuration by searching upward from the current working directory
    pub fn load_from_cwd() -> Result<Option<Self>> {
        let cwd = std::env::current_dir()?;
        Self::load(&cwd)
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut config = HttpClientConfig::new();

        if let Some(timeout) = self.http.timeout {
            config = config.with_timeout(Duration::from_secs(timeout));
        }
        if let Some(connect_timeout) = self.http.connect_timeout {
            config = config.with_connect_timeout(Duration::from_secs(connect_timeout));
        }
        if let Some(user_agent) = &self.http.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        if let Some(proxy) = &self.http.proxy {
            config = config.with_proxy(proxy.clone());
        }
        if let Some(cafile) = &self.http.cafile {
            config = config.with_cafile(cafile.clone());
        }

        config
    }

    /// Install settings, with `--copy` on the command line overriding the file
    pub fn install_config(&self, force_copy: bool) -> InstallConfig {
        let link_mode = if force_copy {
            LinkMode::CopyOnly
        } else {
            self.install.link_mode.unwrap_or_default()
        };

        InstallConfig {
            link_mode,
            temp_dir: self.install.temp_dir.clone(),
        }
    }
}
