//! String Cache Backend
//!
//! Packs each record into a single string value, `<serialized state>#<hash>`,
//! stored with a relative expiry in seconds. This is the layout used with
//! Redis-style caches.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::traits::BackendAdapter;
use crate::storage::errors::StorageResult;
use crate::storage::models::{StorageRecord, StoredState};

const SEPARATOR: char = '#';

/// Minimal string cache client: `GET` and `SET` with optional `EX`
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Value stored under `key`, or `None` when missing or expired
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value`, expiring after `expire_seconds` when given
    async fn set(&self, key: &str, value: &str, expire_seconds: Option<u64>)
        -> StorageResult<()>;
}

/// Process-local [`CacheClient`] honoring expiry on reads
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl InMemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value, bypassing the record layout
    pub async fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .lock()
            .await
            .insert(key.into(), (value.into(), None));
    }
}

#[async_trait]
impl CacheClient for InMemoryCache {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some((_, Some(deadline))) => *deadline <= Instant::now(),
            Some((_, None)) => false,
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        expire_seconds: Option<u64>,
    ) -> StorageResult<()> {
        let deadline = expire_seconds.map(|secs| Instant::now() + Duration::from_secs(secs));
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }
}

/// Backend storing packed `state#hash` strings in a [`CacheClient`]
pub struct CacheBackend<C> {
    client: C,
    namespace: Option<String>,
}

impl<C: CacheClient> CacheBackend<C> {
    /// Wrap a cache client
    pub fn new(client: C) -> Self {
        Self {
            client,
            namespace: None,
        }
    }

    /// Prefix every key with `<namespace>:`
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// The wrapped cache client
    pub fn client(&self) -> &C {
        &self.client
    }

    fn cache_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}:{}", namespace, key),
            None => key.to_string(),
        }
    }

    /// Split a packed value. A value without separator reads as an empty state with no hash.
    fn unpack(value: &str) -> StoredState {
        match value.rsplit_once(SEPARATOR) {
            Some((state, hash)) => {
                let hash = Some(hash.to_string()).filter(|h| !h.is_empty());
                StoredState::new(state, hash)
            }
            None => StoredState::new("{}", None),
        }
    }
}

#[async_trait]
impl<C: CacheClient> BackendAdapter for CacheBackend<C> {
    fn backend_type(&self) -> &'static str {
        "cache"
    }

    async fn read(&self, key: &str) -> StorageResult<Option<StoredState>> {
        let value = self.client.get(&self.cache_key(key)).await?;
        Ok(value.as_deref().map(Self::unpack))
    }

    async fn write(&self, record: &StorageRecord) -> StorageResult<()> {
        let value = format!("{}{}{}", record.serialized_state, SEPARATOR, record.hash);
        // EX takes whole seconds; never shorten a TTL below what was asked
        let expire_seconds = record.ttl_seconds().map(|secs| secs.max(1) as u64);
        self.client
            .set(&self.cache_key(&record.key), &value, expire_seconds)
            .await
    }
}
