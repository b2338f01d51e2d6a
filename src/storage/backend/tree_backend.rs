//! In-Memory Realtime-Tree Backend
//!
//! Mirrors a realtime JSON tree database (Firebase-style). Records are child
//! nodes of one reference, each named by a generated push id:
//!
//! ```text
//! <ref>/<push id> = { "key": "<storage key>", "state": "<envelope JSON>" }
//! ```
//!
//! The envelope is a JSON string holding `data`, `hash`, `type`,
//! `lastModified` and, with TTL, `expireAt`. Records are found through a
//! secondary index on the `key` child (the `orderByChild("key").equalTo(key)`
//! query). A write pushes a new child when no child matches and updates the
//! matched child's `state` otherwise, so push ids stay stable across updates.
//!
//! The tree has no native expiry: a child whose `expireAt` has passed reads as
//! absent and is removed on that read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

use super::traits::BackendAdapter;
use crate::storage::errors::{StorageError, StorageResult};
use crate::storage::models::{PartitionKind, StorageRecord, StoredState};

/// One child node of the reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Indexed storage key
    pub key: String,
    /// Envelope serialized as a JSON string
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateEnvelope {
    data: String,
    hash: String,
    #[serde(rename = "type")]
    partition_kind: PartitionKind,
    last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expire_at: Option<DateTime<Utc>>,
}

impl From<&StorageRecord> for StateEnvelope {
    fn from(record: &StorageRecord) -> Self {
        Self {
            data: record.serialized_state.clone(),
            hash: record.hash.clone(),
            partition_kind: record.partition_kind,
            last_modified: record.last_modified,
            expire_at: record.expire_at,
        }
    }
}

#[derive(Default)]
struct Tree {
    children: BTreeMap<String, TreeNode>,
    /// key -> push id
    by_key: HashMap<String, String>,
    pushes: u64,
}

impl Tree {
    /// Push ids sort in creation order: millisecond timestamp, then a sequence number
    fn next_push_id(&mut self) -> String {
        self.pushes += 1;
        format!("-{:012x}{:08x}", Utc::now().timestamp_millis(), self.pushes)
    }

    fn remove(&mut self, key: &str) {
        if let Some(push_id) = self.by_key.remove(key) {
            self.children.remove(&push_id);
        }
    }
}

/// Child records under one reference, looked up by their `key` child
pub struct TreeBackend {
    ref_name: String,
    tree: Mutex<Tree>,
}

impl TreeBackend {
    /// Create an empty reference named `ref_name`
    pub fn new(ref_name: impl Into<String>) -> Self {
        Self {
            ref_name: ref_name.into(),
            tree: Mutex::new(Tree::default()),
        }
    }

    /// Name of the reference the children live under
    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    /// Push id and node of the child indexed under `key`, ignoring expiry
    pub async fn child(&self, key: &str) -> Option<(String, TreeNode)> {
        let tree = self.tree.lock().await;
        let push_id = tree.by_key.get(key)?;
        tree.children
            .get(push_id)
            .map(|node| (push_id.clone(), node.clone()))
    }

    /// Full path of a child, `<ref>/<push id>`
    pub fn child_path(&self, push_id: &str) -> String {
        format!("{}/{}", self.ref_name, push_id)
    }

    /// Number of children
    pub async fn len(&self) -> usize {
        self.tree.lock().await.children.len()
    }

    /// Whether the reference has no children
    pub async fn is_empty(&self) -> bool {
        self.tree.lock().await.children.is_empty()
    }
}

#[async_trait]
impl BackendAdapter for TreeBackend {
    fn backend_type(&self) -> &'static str {
        "tree"
    }

    async fn read(&self, key: &str) -> StorageResult<Option<StoredState>> {
        let mut tree = self.tree.lock().await;
        let node = match tree.by_key.get(key).and_then(|id| tree.children.get(id)) {
            Some(node) => node,
            None => return Ok(None),
        };

        let envelope: StateEnvelope = serde_json::from_str(&node.state).map_err(|e| {
            StorageError::deserialization(format!(
                "Invalid state envelope under {}: {}",
                self.ref_name, e
            ))
        })?;

        if matches!(envelope.expire_at, Some(expire_at) if expire_at <= Utc::now()) {
            tree.remove(key);
            debug!(target: "botstorage::storage", key = %key, "Removed expired child");
            return Ok(None);
        }

        Ok(Some(StoredState::new(envelope.data, Some(envelope.hash))))
    }

    async fn write(&self, record: &StorageRecord) -> StorageResult<()> {
        let state = serde_json::to_string(&StateEnvelope::from(record))?;
        let mut tree = self.tree.lock().await;

        let matched = tree.by_key.get(&record.key).cloned();
        match matched.and_then(|id| tree.children.get_mut(&id)) {
            Some(node) => node.state = state,
            None => {
                let push_id = tree.next_push_id();
                debug!(
                    target: "botstorage::storage",
                    key = %record.key,
                    path = %self.child_path(&push_id),
                    "Pushing new child"
                );
                tree.children.insert(
                    push_id.clone(),
                    TreeNode {
                        key: record.key.clone(),
                        state,
                    },
                );
                tree.by_key.insert(record.key.clone(), push_id);
            }
        }
        Ok(())
    }
}
