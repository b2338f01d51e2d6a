//! Data models for the storage system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::errors::{StorageError, StorageResult};

/// Opaque content of one partition
pub type PartitionState = Value;

/// The three independent slices of conversation state.
///
/// Variant order is the order partitions are derived, read and reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PartitionKind {
    /// Data scoped to a user, shared across conversations
    UserData,
    /// Data scoped to a (user, conversation) pair
    PrivateConversationData,
    /// Data scoped to a conversation, shared by its members
    ConversationData,
}

impl PartitionKind {
    /// Every partition, in derivation order
    pub const ALL: [PartitionKind; 3] = [
        PartitionKind::UserData,
        PartitionKind::PrivateConversationData,
        PartitionKind::ConversationData,
    ];

    /// Wire name, e.g. `userData`
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::UserData => "userData",
            PartitionKind::PrivateConversationData => "privateConversationData",
            PartitionKind::ConversationData => "conversationData",
        }
    }

    /// Name of the companion hash field, e.g. `userDataHash`
    pub fn hash_key(&self) -> &'static str {
        match self {
            PartitionKind::UserData => "userDataHash",
            PartitionKind::PrivateConversationData => "privateConversationDataHash",
            PartitionKind::ConversationData => "conversationDataHash",
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartitionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StorageError::deserialization(format!("Unknown partition type: {}", s)))
    }
}

/// Identifies which partitions a call concerns.
///
/// Built by the hosting framework for every call; never modified by the storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageContext {
    /// User the call is made for
    pub user_id: Option<String>,
    /// Conversation the call is made in
    pub conversation_id: Option<String>,
    /// Read and write `UserData`
    #[serde(default)]
    pub persist_user_data: bool,
    /// Read and write `ConversationData`
    #[serde(default)]
    pub persist_conversation_data: bool,
}

impl StorageContext {
    /// Create an empty context (no identifiers, nothing persisted)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user id
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the conversation id
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Enable or disable `UserData`
    pub fn persist_user_data(mut self, persist: bool) -> Self {
        self.persist_user_data = persist;
        self
    }

    /// Enable or disable `ConversationData`
    pub fn persist_conversation_data(mut self, persist: bool) -> Self {
        self.persist_conversation_data = persist;
        self
    }

    /// User id, if present and non-empty
    pub fn user(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Conversation id, if present and non-empty
    pub fn conversation(&self) -> Option<&str> {
        self.conversation_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// One backend read to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadDescriptor {
    /// Storage key
    pub key: String,
    /// Partition the key belongs to
    pub partition_kind: PartitionKind,
}

/// What a backend returns for a key that exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredState {
    /// State as JSON text
    pub serialized_state: String,
    /// Hash written alongside the state, if any
    pub hash: Option<String>,
}

impl StoredState {
    /// Create a stored state
    pub fn new(serialized_state: impl Into<String>, hash: Option<String>) -> Self {
        Self {
            serialized_state: serialized_state.into(),
            hash,
        }
    }
}

/// A single partition write, built right before it is issued
#[derive(Debug, Clone, PartialEq)]
pub struct StorageRecord {
    /// Storage key
    pub key: String,
    /// Canonical JSON text of the state
    pub serialized_state: String,
    /// SHA-256 of `serialized_state`
    pub hash: String,
    /// Partition being written
    pub partition_kind: PartitionKind,
    /// Time of the save
    pub last_modified: DateTime<Utc>,
    /// Absolute expiry, only with TTL
    pub expire_at: Option<DateTime<Utc>>,
}

impl StorageRecord {
    /// Expiry relative to `last_modified`, in whole seconds rounded up
    pub fn ttl_seconds(&self) -> Option<i64> {
        self.expire_at.map(|expire_at| {
            let millis = (expire_at - self.last_modified).num_milliseconds();
            millis.div_euclid(1000) + i64::from(millis.rem_euclid(1000) > 0)
        })
    }
}

/// State and last known hash of one partition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionEntry {
    /// Current state, `None` when absent
    pub state: Option<PartitionState>,
    /// Hash of the state as last read or saved
    pub hash: Option<String>,
}

/// Partition states keyed by kind, each paired with its stored hash.
///
/// Returned by `get_data` and handed back to `save_data` after the caller
/// has updated the states.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotStateData {
    partitions: BTreeMap<PartitionKind, PartitionEntry>,
}

impl BotStateData {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no partition is present
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Number of partitions present
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Entry of a partition
    pub fn get(&self, kind: PartitionKind) -> Option<&PartitionEntry> {
        self.partitions.get(&kind)
    }

    /// State of a partition
    pub fn state(&self, kind: PartitionKind) -> Option<&PartitionState> {
        self.partitions.get(&kind).and_then(|entry| entry.state.as_ref())
    }

    /// Last known hash of a partition
    pub fn hash(&self, kind: PartitionKind) -> Option<&str> {
        self.partitions
            .get(&kind)
            .and_then(|entry| entry.hash.as_deref())
    }

    /// Partitions present, in derivation order
    pub fn kinds(&self) -> impl Iterator<Item = PartitionKind> + '_ {
        self.partitions.keys().copied()
    }

    /// Insert or replace a whole entry
    pub fn insert(&mut self, kind: PartitionKind, entry: PartitionEntry) {
        self.partitions.insert(kind, entry);
    }

    /// Replace a partition's state, keeping its last known hash
    pub fn set_state(&mut self, kind: PartitionKind, state: PartitionState) -> &mut Self {
        self.partitions.entry(kind).or_default().state = Some(state);
        self
    }

    /// Mark a partition's state as absent, keeping its last known hash
    pub fn clear_state(&mut self, kind: PartitionKind) -> &mut Self {
        self.partitions.entry(kind).or_default().state = None;
        self
    }

    /// Replace a partition's last known hash
    pub fn set_hash(&mut self, kind: PartitionKind, hash: impl Into<String>) -> &mut Self {
        self.partitions.entry(kind).or_default().hash = Some(hash.into());
        self
    }

    /// Adopt the hashes produced by a save so the next save can skip unchanged partitions
    pub fn apply_report(&mut self, report: &SaveReport) {
        for (kind, hash) in &report.hashes {
            self.set_hash(*kind, hash.clone());
        }
    }

    /// Flat layout used by hosting frameworks: `{"userData": .., "userDataHash": .., ..}`
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (kind, entry) in &self.partitions {
            if let Some(state) = &entry.state {
                map.insert(kind.as_str().to_string(), state.clone());
            }
            if let Some(hash) = &entry.hash {
                map.insert(kind.hash_key().to_string(), Value::String(hash.clone()));
            }
        }
        Value::Object(map)
    }

    /// Parse the flat layout produced by [`BotStateData::to_json`]
    pub fn from_json(value: &Value) -> StorageResult<Self> {
        let map = value.as_object().ok_or_else(|| {
            StorageError::deserialization("Bot state data must be a JSON object")
        })?;

        let mut data = Self::new();
        for kind in PartitionKind::ALL {
            let state = map.get(kind.as_str()).filter(|v| !v.is_null()).cloned();
            let hash = match map.get(kind.hash_key()) {
                None | Some(Value::Null) => None,
                Some(Value::String(hash)) => Some(hash.clone()),
                Some(other) => {
                    return Err(StorageError::deserialization(format!(
                        "{} must be a string, found {}",
                        kind.hash_key(),
                        other
                    )))
                }
            };
            if state.is_some() || hash.is_some() || map.contains_key(kind.as_str()) {
                data.insert(kind, PartitionEntry { state, hash });
            }
        }
        Ok(data)
    }
}

/// Outcome of a successful `save_data` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Partitions that were written to the backend
    pub written: Vec<PartitionKind>,
    /// Partitions skipped because their hash was unchanged
    pub skipped: Vec<PartitionKind>,
    /// Current hash of every eligible partition
    pub hashes: BTreeMap<PartitionKind, String>,
}

impl SaveReport {
    /// True when nothing needed writing
    pub fn is_noop(&self) -> bool {
        self.written.is_empty()
    }

    /// Hash of a partition after the save
    pub fn hash(&self, kind: PartitionKind) -> Option<&str> {
        self.hashes.get(&kind).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partition_kind_names() {
        assert_eq!(PartitionKind::UserData.as_str(), "userData");
        assert_eq!(
            PartitionKind::PrivateConversationData.hash_key(),
            "privateConversationDataHash"
        );
        assert_eq!(
            "conversationData".parse::<PartitionKind>().unwrap(),
            PartitionKind::ConversationData
        );
        assert!("sessionData".parse::<PartitionKind>().is_err());
        assert_eq!(
            serde_json::to_value(PartitionKind::PrivateConversationData).unwrap(),
            json!("privateConversationData")
        );
    }

    #[test]
    fn test_context_ignores_empty_ids() {
        let context = StorageContext::new().with_user("").with_conversation("c1");
        assert_eq!(context.user(), None);
        assert_eq!(context.conversation(), Some("c1"));
    }

    #[test]
    fn test_context_deserializes_host_layout() {
        let context: StorageContext = serde_json::from_value(json!({
            "userId": "default-user",
            "conversationId": "123456789",
            "persistUserData": true
        }))
        .unwrap();
        assert_eq!(context.user(), Some("default-user"));
        assert!(context.persist_user_data);
        assert!(!context.persist_conversation_data);
    }

    #[test]
    fn test_record_ttl_seconds() {
        let now = Utc::now();
        let mut record = StorageRecord {
            key: "k".to_string(),
            serialized_state: "{}".to_string(),
            hash: "h".to_string(),
            partition_kind: PartitionKind::UserData,
            last_modified: now,
            expire_at: None,
        };
        assert_eq!(record.ttl_seconds(), None);

        record.expire_at = Some(now + chrono::Duration::seconds(3600));
        assert_eq!(record.ttl_seconds(), Some(3600));

        record.expire_at = Some(now + chrono::Duration::milliseconds(1500));
        assert_eq!(record.ttl_seconds(), Some(2));
    }

    #[test]
    fn test_state_data_json_layout() {
        let mut data = BotStateData::new();
        data.set_state(PartitionKind::UserData, json!({"name": "ada"}))
            .set_hash(PartitionKind::UserData, "abc");
        data.set_state(PartitionKind::ConversationData, json!({}));

        let flat = data.to_json();
        assert_eq!(
            flat,
            json!({
                "userData": {"name": "ada"},
                "userDataHash": "abc",
                "conversationData": {}
            })
        );

        let parsed = BotStateData::from_json(&flat).unwrap();
        assert_eq!(parsed, data);
    }

    #[test]
    fn test_state_data_rejects_bad_layout() {
        assert!(BotStateData::from_json(&json!([1, 2])).is_err());
        assert!(BotStateData::from_json(&json!({"userDataHash": 42})).is_err());
    }

    #[test]
    fn test_apply_report_updates_hashes() {
        let mut data = BotStateData::new();
        data.set_state(PartitionKind::UserData, json!({"a": 1}));

        let mut report = SaveReport::default();
        report.hashes.insert(PartitionKind::UserData, "new-hash".to_string());
        data.apply_report(&report);

        assert_eq!(data.hash(PartitionKind::UserData), Some("new-hash"));
        assert_eq!(data.state(PartitionKind::UserData), Some(&json!({"a": 1})));
    }
}
