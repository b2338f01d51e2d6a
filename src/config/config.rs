//! TOML configuration parsing and management.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::environment::EnvironmentLoader;
use crate::storage::{
    BackendBuilder, BotStorage, BotStorageSettings, ExpirationPolicy, StorageResult, TtlSettings,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Backend selection and backend-specific settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Optional per-partition TTL in seconds
    pub ttl: Option<TtlSettings>,
}

/// Backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "memory", "cache", "tree" or "documentdb"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// `[storage.memory]`
    #[serde(default)]
    pub memory: MemoryConfig,
    /// `[storage.cache]`
    #[serde(default)]
    pub cache: CacheConfig,
    /// `[storage.tree]`
    #[serde(default)]
    pub tree: TreeConfig,
    /// `[storage.documentdb]`, required when the backend is documentdb
    pub documentdb: Option<DocumentDbConfig>,
}

fn default_backend() -> String {
    "memory".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            memory: MemoryConfig::default(),
            cache: CacheConfig::default(),
            tree: TreeConfig::default(),
            documentdb: None,
        }
    }
}

/// Typed-attribute table settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Attribute holding the storage key
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            primary_key: default_primary_key(),
        }
    }
}

/// String cache settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefix applied to every cache key
    pub namespace: Option<String>,
}

/// Realtime-tree settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Reference the child records are pushed under
    #[serde(default = "default_collection")]
    pub ref_name: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            ref_name: default_collection(),
        }
    }
}

/// DocumentDB/MongoDB settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDbConfig {
    /// MongoDB connection string
    pub connection_string: String,
    /// Database name
    pub database: String,
    /// Collection name, `botdata` by default
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Create a TTL index on `expireAt` at startup
    #[serde(default = "default_create_ttl_index")]
    pub create_ttl_index: bool,
}

fn default_collection() -> String {
    "botdata".to_string()
}

fn default_create_ttl_index() -> bool {
    true
}

/// Loads and manages TOML configuration.
#[derive(Debug)]
pub struct ConfigurationLoader {
    /// Where the configuration was (or would have been) read from
    pub config_path: PathBuf,
    /// Parsed configuration
    pub config: Configuration,
}

impl ConfigurationLoader {
    /// Initialize configuration loader.
    ///
    /// # Arguments
    /// * `config_path` - Path to TOML config file. If None, uses `config/botstorage.toml`;
    ///   a missing file yields the default configuration.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config_path = config_path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("config/botstorage.toml"));

        let config = if config_path.exists() {
            Self::load_config(&config_path)?
        } else {
            Configuration::default()
        };

        let loader = Self {
            config_path,
            config,
        };
        loader.validate()?;
        Ok(loader)
    }

    /// Create a configuration loader from a pre-parsed Configuration.
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config_path: PathBuf::from("config/botstorage.toml"),
            config,
        }
    }

    /// Load configuration from TOML file.
    fn load_config(path: &Path) -> Result<Configuration> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Check TTL values and backend-specific settings.
    pub fn validate(&self) -> Result<()> {
        if let Some(ttl) = &self.config.ttl {
            if !ExpirationPolicy::validate(ttl) {
                bail!(
                    "Invalid TTL settings in {}: user_data, conversation_data and private_conversation_data must all be positive",
                    self.config_path.display()
                );
            }
        }

        match self.config.storage.backend.as_str() {
            "memory" | "cache" | "tree" | "firebase" => Ok(()),
            "documentdb" | "mongodb" => match &self.config.storage.documentdb {
                Some(_) => Ok(()),
                None => bail!("storage.backend is documentdb but [storage.documentdb] is missing"),
            },
            other => bail!("Unknown storage backend: {}", other),
        }
    }

    /// Apply environment overrides (backend selection, MongoDB URI)
    pub fn apply_environment(&mut self, env: &EnvironmentLoader) {
        if let Some(backend) = env.backend() {
            self.config.storage.backend = backend;
        }
        if let Some(uri) = env.mongodb_uri() {
            if let Some(documentdb) = self.config.storage.documentdb.as_mut() {
                documentdb.connection_string = uri;
            }
        }
    }

    /// Settings for [`BotStorage::new`]
    pub fn storage_settings(&self) -> BotStorageSettings {
        BotStorageSettings {
            ttl: self.config.ttl.clone(),
        }
    }

    /// Translate the storage section into a backend builder
    pub fn backend_builder(&self) -> BackendBuilder {
        let storage = &self.config.storage;
        let mut builder = BackendBuilder::new(&storage.backend)
            .with_option("primary_key", &storage.memory.primary_key)
            .with_option("ref_name", &storage.tree.ref_name);
        if let Some(namespace) = &storage.cache.namespace {
            builder = builder.with_option("namespace", namespace);
        }
        if let Some(documentdb) = &storage.documentdb {
            builder = builder
                .with_option("connection_string", &documentdb.connection_string)
                .with_option("database", &documentdb.database)
                .with_option("collection", &documentdb.collection)
                .with_option(
                    "create_ttl_index",
                    if documentdb.create_ttl_index { "true" } else { "false" },
                );
        }
        builder
    }

    /// Build the configured backend and wrap it in a [`BotStorage`]
    pub async fn build_storage(&self) -> StorageResult<BotStorage> {
        let backend = self.backend_builder().build().await?;
        BotStorage::new(backend, self.storage_settings())
    }
}
