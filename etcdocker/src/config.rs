use std::path::Path;
use serde::Deserialize;
use anyhow::{Context, Result};
use crate::links::LinkVariant;

/// Read when no config path is given, if present
pub const DEFAULT_CONFIG_PATH: &str = "/etc/etcdocker/etcdocker.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub links: LinkConfig,
    #[serde(default)]
    pub docker: DockerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Comma-separated peers; empty means the local default
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_verify_cluster")]
    pub verify_cluster: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub variant: LinkVariant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockerConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
}

fn default_verify_cluster() -> bool {
    true
}

fn default_binary() -> String {
    "docker".to_string()
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            verify_cluster: default_verify_cluster(),
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `path` if given, else the system file if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let system = Path::new(DEFAULT_CONFIG_PATH);
        if system.exists() {
            tracing::debug!("Using {}", DEFAULT_CONFIG_PATH);
            return Self::load(system);
        }

        Ok(Self::default())
    }
}
