//! Service configuration
use crate::page::PageLimits;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// address the http server binds to
    pub listen_addr: String,
    /// sled database holding references and the identity directory
    pub ledger_path: PathBuf,
    /// sled database holding achievement content
    pub content_path: PathBuf,
    /// upper bound for a single storage operation
    pub storage_timeout_secs: u64,
    pub log_level: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4000".to_string(),
            ledger_path: PathBuf::from("data/ledger"),
            content_path: PathBuf::from("data/content"),
            storage_timeout_secs: 10,
            log_level: "info".to_string(),
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl Config {
    /// Reads a toml file. Keys that are left out keep their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("failed to parse config file: {:?}", path))
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs.max(1))
    }

    pub fn page_limits(&self) -> PageLimits {
        let max_size = self.max_page_size.max(1);
        PageLimits {
            default_size: self.default_page_size.clamp(1, max_size),
            max_size,
        }
    }
}
