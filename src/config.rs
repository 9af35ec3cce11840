//! Configuration management for the home library server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which durable store backs the ledger
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
    Snapshot,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite connection URL (sqlite backend)
    pub url: String,
    pub max_connections: u32,
    /// JSON snapshot file (snapshot backend)
    pub snapshot_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LibraryConfig {
    /// Shelf names offered when adding an item
    pub shelves: Vec<String>,
    /// Days after which a checked out item is flagged as past due
    pub past_due_days: u32,
    /// Require keys to be valid ISBN-10 / ISBN-13
    pub strict_isbn: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub library: LibraryConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix HOMELIB_)
            .add_source(environment())
            .set_override_option("storage.url", env::var("DATABASE_URL").ok())?
            .set_override_option("storage.snapshot_path", env::var("HOMELIB_SNAPSHOT").ok())?
            .build()?;

        config.try_deserialize()
    }
}

/// `HOMELIB_<SECTION>__<KEY>`, e.g. `HOMELIB_STORAGE__MAX_CONNECTIONS=8`
fn environment() -> Environment {
    Environment::with_prefix("HOMELIB")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            library: LibraryConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            url: "sqlite://library.db?mode=rwc".to_string(),
            max_connections: 4,
            snapshot_path: PathBuf::from("library.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            shelves: Vec::new(),
            past_due_days: 30,
            strict_isbn: false,
        }
    }
}
