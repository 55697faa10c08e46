//! Configuration schema (seedorder.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::hierarchy::{Hierarchy, HierarchyError, TableNode};

/// Default transaction timeout for one seeding run
pub const DEFAULT_TRANSACTION_TIMEOUT_SECS: u64 = 300;

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string (`host=... user=... dbname=...` or URL form)
    #[serde(default)]
    pub url: Option<String>,

    /// Connect over TLS
    #[serde(default)]
    pub tls: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            tls: false,
        }
    }
}

/// Active-seed registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// JSON file holding one active record per (table, kind)
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("seed/.active-seeds.json"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the seed file tree (`<seed_dir>/<kind>/<table>/<file>.csv`)
    #[serde(default = "default_seed_dir")]
    pub seed_dir: PathBuf,

    /// Upper bound for one seeding transaction
    #[serde(default = "default_timeout_secs")]
    pub transaction_timeout_secs: u64,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    /// Seedable tables in declaration order
    #[serde(default)]
    pub tables: Vec<TableNode>,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_seed_dir() -> PathBuf {
    PathBuf::from("seed")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TRANSACTION_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_dir: default_seed_dir(),
            transaction_timeout_secs: DEFAULT_TRANSACTION_TIMEOUT_SECS,
            database: DatabaseConfig::default(),
            registry: RegistryConfig::default(),
            tables: Vec::new(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validated table hierarchy
    pub fn hierarchy(&self) -> Result<Hierarchy, ConfigError> {
        Ok(Hierarchy::new(self.tables.clone())?)
    }

    /// Seed directory resolved against the project root
    pub fn seed_root(&self) -> PathBuf {
        self.resolve(&self.seed_dir)
    }

    /// Registry file resolved against the project root
    pub fn registry_path(&self) -> PathBuf {
        self.resolve(&self.registry.path)
    }

    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout_secs)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid table hierarchy: {0}")]
    Hierarchy(#[from] HierarchyError),
}
