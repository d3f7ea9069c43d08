//! Server configuration
//!
//! Loaded from a TOML file, then overridden by `FORUMDB_*` environment
//! variables, then by command line flags (applied by the binary).
//!
//! ```toml
//! [server]
//! resp_addr = "127.0.0.1:6379"
//! web_addr = "127.0.0.1:8080"
//! web_enabled = true
//!
//! [storage]
//! backend = "sharded"   # or "memory"
//! shards = 0            # 0 = one per CPU, at most 16
//! capacity = 1024
//! expiry_poll_ms = 1000
//!
//! [aof]
//! enabled = true
//! dir = "data"
//! sync = "everysec"     # always | everysec | no
//!
//! [logging]
//! level = "info"
//! ```

use crate::aof::SyncPolicy;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Which backend serves the contract; chosen once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One keyspace behind a mutex, expiry by polling
    #[default]
    Memory,
    /// Shard threads, expiry by timer queue
    Sharded,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Sharded => "sharded",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "sharded" => Ok(BackendKind::Sharded),
            _ => Err(ConfigError::Invalid {
                name: "backend",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub aof: AofSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub resp_addr: String,
    pub web_addr: String,
    pub web_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            resp_addr: "127.0.0.1:6379".to_string(),
            web_addr: "127.0.0.1:8080".to_string(),
            web_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    /// Shard count for the sharded backend; 0 picks one per CPU
    pub shards: usize,
    /// Initial keyspace capacity (per shard)
    pub capacity: usize,
    /// Sweep interval of the memory backend
    pub expiry_poll_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: BackendKind::Memory,
            shards: 0,
            capacity: 1024,
            expiry_poll_ms: 1000,
        }
    }
}

impl StorageConfig {
    /// Shard count with 0 resolved to the CPU count, clamped to 1..=16
    pub fn resolved_shards(&self) -> usize {
        match self.shards {
            0 => num_cpus::get().clamp(1, 16),
            n => n,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AofSettings {
    pub enabled: bool,
    pub dir: PathBuf,
    pub sync: SyncPolicy,
}

impl Default for AofSettings {
    fn default() -> Self {
        AofSettings {
            enabled: true,
            dir: PathBuf::from("."),
            sync: SyncPolicy::EverySec,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Apply `FORUMDB_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("FORUMDB_BACKEND") {
            self.storage.backend = value.parse()?;
        }
        if let Some(value) = lookup("FORUMDB_SHARDS") {
            self.storage.shards = value.parse().map_err(|_| ConfigError::Invalid {
                name: "FORUMDB_SHARDS",
                value,
            })?;
        }
        if let Some(value) = lookup("FORUMDB_RESP_ADDR") {
            self.server.resp_addr = value;
        }
        if let Some(value) = lookup("FORUMDB_WEB_ADDR") {
            self.server.web_addr = value;
        }
        if let Some(value) = lookup("FORUMDB_AOF_DIR") {
            self.aof.dir = PathBuf::from(value);
        }
        Ok(())
    }

    /// Settings for unit tests and embedding: memory backend, no log file
    pub fn ephemeral() -> Self {
        let mut config = Config::default();
        config.aof.enabled = false;
        config.server.web_enabled = false;
        config
    }
}
