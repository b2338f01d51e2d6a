//! Builder for creating storage backends from configuration

use std::collections::HashMap;
use std::sync::Arc;

use super::cache_backend::{CacheBackend, InMemoryCache};
use super::memory_backend::MemoryBackend;
use super::traits::BackendAdapter;
use super::tree_backend::TreeBackend;
use crate::storage::errors::{StorageError, StorageResult};

/// Builds a backend by name from string options
pub struct BackendBuilder {
    backend_type: String,
    config: HashMap<String, String>,
}

impl BackendBuilder {
    /// Create a new builder
    pub fn new(backend_type: &str) -> Self {
        Self {
            backend_type: backend_type.to_string(),
            config: HashMap::new(),
        }
    }

    /// Add a configuration option
    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.config.insert(key.to_string(), value.to_string());
        self
    }

    fn option(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> StorageResult<&str> {
        self.option(key).ok_or_else(|| {
            StorageError::configuration(format!(
                "{} backend requires {}",
                self.backend_type, key
            ))
        })
    }

    /// Build the storage backend
    pub async fn build(self) -> StorageResult<Arc<dyn BackendAdapter>> {
        match self.backend_type.as_str() {
            "memory" => {
                let primary_key = self.option("primary_key").unwrap_or("id");
                Ok(Arc::new(MemoryBackend::with_primary_key(primary_key)))
            }
            "cache" => {
                let mut backend = CacheBackend::new(InMemoryCache::new());
                if let Some(namespace) = self.option("namespace") {
                    backend = backend.with_namespace(namespace);
                }
                Ok(Arc::new(backend))
            }
            "tree" | "firebase" => Ok(Arc::new(TreeBackend::new(self.required("ref_name")?))),
            #[cfg(feature = "storage-documentdb")]
            "documentdb" | "mongodb" => {
                let backend = super::DocumentDbBackend::new(
                    self.required("connection_string")?,
                    self.required("database")?,
                    self.option("collection")
                        .unwrap_or(super::documentdb_backend::DEFAULT_COLLECTION),
                )
                .await?;
                if self.option("create_ttl_index") == Some("true") {
                    backend.ensure_ttl_index().await?;
                }
                Ok(Arc::new(backend))
            }
            #[cfg(not(feature = "storage-documentdb"))]
            "documentdb" | "mongodb" => Err(StorageError::configuration(
                "DocumentDB backend requires the storage-documentdb feature",
            )),
            unknown => Err(StorageError::configuration(format!(
                "Unknown backend type: {}",
                unknown
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_memory_backend() {
        let backend = BackendBuilder::new("memory")
            .with_option("primary_key", "botKey")
            .build()
            .await
            .unwrap();
        assert_eq!(backend.backend_type(), "memory");
    }

    #[tokio::test]
    async fn test_builder_cache_backend() {
        let backend = BackendBuilder::new("cache")
            .with_option("namespace", "botstate")
            .build()
            .await
            .unwrap();
        assert_eq!(backend.backend_type(), "cache");
    }

    #[tokio::test]
    async fn test_builder_tree_backend_requires_ref_name() {
        let backend = BackendBuilder::new("tree")
            .with_option("ref_name", "botdata")
            .build()
            .await
            .unwrap();
        assert_eq!(backend.backend_type(), "tree");

        let result = BackendBuilder::new("firebase").build().await;
        match result {
            Err(StorageError::Configuration(msg)) => assert!(msg.contains("ref_name")),
            _ => panic!("expected configuration error"),
        }
    }

    #[tokio::test]
    async fn test_builder_unknown_backend() {
        let result = BackendBuilder::new("unknown").build().await;
        match result {
            Err(StorageError::Configuration(msg)) => assert!(msg.contains("Unknown backend type")),
            _ => panic!("expected configuration error"),
        }
    }
}
