use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlobConfig {
    /// Top-level namespace under which per-user folders live
    /// (`{namespace_root}/{owner_id}/...`).
    #[serde(default = "default_namespace_root")]
    pub namespace_root: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            namespace_root: default_namespace_root(),
        }
    }
}

fn default_namespace_root() -> String {
    "users".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_size: u32,
    #[serde(default = "default_max_size")]
    pub max_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_size: default_page_size(),
            max_size: default_max_size(),
        }
    }
}

fn default_page_size() -> u32 {
    20
}
fn default_max_size() -> u32 {
    100
}

impl PaginationConfig {
    /// Coerce a requested page size to the configured bounds.
    pub fn clamp_size(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(0) | None => self.default_size,
            Some(size) => size.min(self.max_size),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}
