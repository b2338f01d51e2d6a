//! In-Memory Typed-Attribute Backend
//!
//! Stores each record as an item of typed scalar attributes, the way a
//! DynamoDB-style table does:
//!
//! | attribute      | type | content                          |
//! |----------------|------|----------------------------------|
//! | `<primaryKey>` | S    | storage key                      |
//! | `data`         | S    | serialized state                 |
//! | `hash`         | S    | content hash                     |
//! | `type`         | S    | partition wire name              |
//! | `lastModified` | S    | RFC 3339 timestamp               |
//! | `expireAt`     | N    | epoch seconds (only with TTL)    |
//!
//! Items whose `expireAt` has passed read as absent and are evicted on that read.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::BackendAdapter;
use crate::storage::errors::{StorageError, StorageResult};
use crate::storage::models::{StorageRecord, StoredState};

/// A typed scalar attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// String
    S(String),
    /// Number, kept in its decimal string form
    N(String),
}

impl AttributeValue {
    /// String content, if this is an `S` attribute
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            AttributeValue::N(_) => None,
        }
    }

    /// Decimal string, if this is an `N` attribute
    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttributeValue::N(n) => Some(n),
            AttributeValue::S(_) => None,
        }
    }
}

/// One stored item
pub type Item = HashMap<String, AttributeValue>;

/// In-memory table of typed items
pub struct MemoryBackend {
    primary_key: String,
    items: RwLock<HashMap<String, Item>>,
}

impl MemoryBackend {
    /// Create an empty table keyed by the `id` attribute
    pub fn new() -> Self {
        Self::with_primary_key("id")
    }

    /// Create an empty table keyed by a custom attribute name
    pub fn with_primary_key(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Attribute holding the storage key
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Raw item stored under `key`, ignoring expiry
    pub async fn item(&self, key: &str) -> Option<Item> {
        self.items.read().await.get(key).cloned()
    }

    /// Number of stored items, expired ones included until they are read
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether the table holds no items
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    fn to_item(&self, record: &StorageRecord) -> Item {
        let mut item = Item::new();
        item.insert(
            self.primary_key.clone(),
            AttributeValue::S(record.key.clone()),
        );
        item.insert(
            "data".to_string(),
            AttributeValue::S(record.serialized_state.clone()),
        );
        item.insert("hash".to_string(), AttributeValue::S(record.hash.clone()));
        item.insert(
            "type".to_string(),
            AttributeValue::S(record.partition_kind.as_str().to_string()),
        );
        item.insert(
            "lastModified".to_string(),
            AttributeValue::S(record.last_modified.to_rfc3339()),
        );
        if let Some(expire_at) = record.expire_at {
            item.insert(
                "expireAt".to_string(),
                AttributeValue::N(expire_at.timestamp().to_string()),
            );
        }
        item
    }

    fn is_expired(item: &Item, now: i64) -> StorageResult<bool> {
        match item.get("expireAt").and_then(AttributeValue::as_n) {
            Some(n) => {
                let expire_at: i64 = n.parse().map_err(|_| {
                    StorageError::deserialization(format!("Invalid expireAt attribute: {}", n))
                })?;
                Ok(expire_at <= now)
            }
            None => Ok(false),
        }
    }

    fn stored(item: &Item) -> StoredState {
        let data = item
            .get("data")
            .and_then(AttributeValue::as_s)
            .unwrap_or("{}");
        let hash = item
            .get("hash")
            .and_then(AttributeValue::as_s)
            .map(str::to_string);

        StoredState::new(data, hash)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendAdapter for MemoryBackend {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: &str) -> StorageResult<Option<StoredState>> {
        let now = Utc::now().timestamp();
        {
            let items = self.items.read().await;
            match items.get(key) {
                None => return Ok(None),
                Some(item) if !Self::is_expired(item, now)? => return Ok(Some(Self::stored(item))),
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a concurrent write may have refreshed the item
        let mut items = self.items.write().await;
        match items.get(key) {
            None => Ok(None),
            Some(item) if !Self::is_expired(item, now)? => Ok(Some(Self::stored(item))),
            Some(_) => {
                items.remove(key);
                debug!(target: "botstorage::storage", key = %key, "Evicted expired item");
                Ok(None)
            }
        }
    }

    async fn write(&self, record: &StorageRecord) -> StorageResult<()> {
        let item = self.to_item(record);
        self.items.write().await.insert(record.key.clone(), item);
        Ok(())
    }
}
