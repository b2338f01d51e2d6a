//! Environment variable loading and management.

use std::env;
use std::path::{Path, PathBuf};

/// Path of the TOML configuration file
pub const CONFIG_VAR: &str = "BOTSTORAGE_CONFIG";
/// Backend override ("memory", "cache", "documentdb")
pub const BACKEND_VAR: &str = "BOTSTORAGE_BACKEND";
/// MongoDB/DocumentDB connection string override
pub const MONGODB_URI_VAR: &str = "BOTSTORAGE_MONGODB_URI";

/// Loads environment variables from .env file and system environment.
#[derive(Debug, Clone)]
pub struct EnvironmentLoader {
    #[allow(dead_code)]
    env_file: Option<String>,
}

impl EnvironmentLoader {
    /// Initialize the environment loader.
    ///
    /// # Arguments
    /// * `env_file` - Path to .env file. Only an explicitly given file is loaded.
    pub fn new(env_file: Option<&Path>) -> Self {
        if let Some(env_path) = env_file {
            if env_path.exists() {
                if let Err(e) = dotenv::from_path(env_path) {
                    tracing::warn!(
                        target: "botstorage::config",
                        path = %env_path.display(),
                        error = %e,
                        "Failed to load .env file"
                    );
                }
            }
        }

        Self {
            env_file: env_file.map(|p| p.to_string_lossy().to_string()),
        }
    }

    /// Config file path from `BOTSTORAGE_CONFIG`
    pub fn config_path(&self) -> Option<PathBuf> {
        non_empty_var(CONFIG_VAR).map(PathBuf::from)
    }

    /// Backend name from `BOTSTORAGE_BACKEND`
    pub fn backend(&self) -> Option<String> {
        non_empty_var(BACKEND_VAR)
    }

    /// Connection string from `BOTSTORAGE_MONGODB_URI`
    pub fn mongodb_uri(&self) -> Option<String> {
        non_empty_var(MONGODB_URI_VAR)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl Default for EnvironmentLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
