//! # Server Configuration
//!
//! Settings are read from a YAML file, then selected environment variables
//! override individual fields:
//!
//! ```yaml
//! bind_address: 127.0.0.1:8787
//! storage: sqlite            # or: memory
//! database_url: sqlite:bill_tracker.db
//! cors_origin: http://localhost:8080
//! static_dir: ./dist         # optional
//! log_filter: info
//! ```
//!
//! The file is named by `BILL_TRACKER_CONFIG`; without it `bill_tracker.yaml`
//! in the working directory is used when present, and built-in defaults
//! otherwise.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_PATH_ENV: &str = "BILL_TRACKER_CONFIG";
pub const BIND_ENV: &str = "BILL_TRACKER_BIND";
pub const DATABASE_URL_ENV: &str = "BILL_TRACKER_DATABASE_URL";
pub const STORAGE_ENV: &str = "BILL_TRACKER_STORAGE";
pub const DEFAULT_CONFIG_FILE: &str = "bill_tracker.yaml";

/// Backing store for synced documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sqlite,
    Memory,
}

impl std::str::FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StorageKind::Sqlite),
            "memory" => Ok(StorageKind::Memory),
            other => Err(anyhow!("Unknown storage kind '{}', expected sqlite or memory", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub storage: StorageKind,
    pub database_url: String,
    pub cors_origin: String,
    pub static_dir: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8787".to_string(),
            storage: StorageKind::Sqlite,
            database_url: "sqlite:bill_tracker.db".to_string(),
            cors_origin: "http://localhost:8080".to_string(),
            static_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_with(explicit.as_deref(), |key| std::env::var(key).ok())
    }

    /// Load from `explicit_path` (or the default file if present), then apply overrides from `env`
    pub fn load_with(explicit_path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };

        if let Some(bind) = env(BIND_ENV) {
            config.bind_address = bind;
        }
        if let Some(url) = env(DATABASE_URL_ENV) {
            config.database_url = url;
        }
        if let Some(storage) = env(STORAGE_ENV) {
            config.storage = storage.parse()?;
        }

        config.socket_addr()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: ServerConfig = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", self.bind_address))
    }
}
