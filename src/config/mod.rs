//! Configuration management for bot storage.
//!
//! This module provides configuration loading through TOML files and
//! environment variable overrides via `.env` files.
//!
//! # Example
//!
//! ```no_run
//! use botstorage::config::{ConfigurationLoader, EnvironmentLoader};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let env = EnvironmentLoader::new(None);
//!     let mut loader = ConfigurationLoader::new(env.config_path().as_deref())?;
//!     loader.apply_environment(&env);
//!
//!     let storage = loader.build_storage().await?;
//!     println!("Backend: {}", storage.backend().backend_type());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod environment;

// Re-export main types for convenience
pub use self::config::{
    CacheConfig, Configuration, ConfigurationLoader, DocumentDbConfig, MemoryConfig,
    StorageConfig, TreeConfig,
};
pub use self::environment::EnvironmentLoader;
