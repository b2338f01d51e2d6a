//! Storage Backend Traits
//!
//! Defines the capability every backing store must provide to the storage core.

use async_trait::async_trait;
use std::sync::Arc;

use crate::storage::errors::StorageResult;
use crate::storage::models::{StorageRecord, StoredState};

/// Core trait for storage backends
///
/// A backend only needs single-key reads and writes. Retries, timeouts and
/// connection handling are the backend's own business; the storage core calls
/// each method once per partition and never retries.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Get the backend type name (e.g., "memory", "cache", "documentdb")
    fn backend_type(&self) -> &'static str;

    /// Check if the backend is available/connected
    async fn is_available(&self) -> bool {
        true
    }

    /// Read the record stored under `key`.
    ///
    /// A missing key is `Ok(None)`, never an error.
    async fn read(&self, key: &str) -> StorageResult<Option<StoredState>>;

    /// Insert or replace the record stored under `record.key`
    async fn write(&self, record: &StorageRecord) -> StorageResult<()>;
}

#[async_trait]
impl<T: BackendAdapter + ?Sized> BackendAdapter for Arc<T> {
    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }

    async fn is_available(&self) -> bool {
        (**self).is_available().await
    }

    async fn read(&self, key: &str) -> StorageResult<Option<StoredState>> {
        (**self).read(key).await
    }

    async fn write(&self, record: &StorageRecord) -> StorageResult<()> {
        (**self).write(record).await
    }
}
