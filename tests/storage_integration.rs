//! End-to-end behavior of BotStorage against the bundled backends

use botstorage::storage::backend::{
    AttributeValue, BackendAdapter, CacheBackend, InMemoryCache, MemoryBackend, TreeBackend,
};
use botstorage::storage::{
    BotStateData, BotStorage, BotStorageSettings, Hasher, PartitionKind, StorageContext,
    StorageError, TtlSettings,
};
use botstorage::test_utils::RecordingBackend;
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;

fn full_context() -> StorageContext {
    StorageContext::new()
        .with_user("default-user")
        .with_conversation("123456789")
        .persist_user_data(true)
        .persist_conversation_data(true)
}

fn sample_state() -> BotStateData {
    let mut data = BotStateData::new();
    data.set_state(PartitionKind::UserData, json!({"state": "user specific"}));
    data.set_state(PartitionKind::ConversationData, json!({"state": "public"}));
    data.set_state(
        PartitionKind::PrivateConversationData,
        json!({"state": "private", "items": [1, 2, 3]}),
    );
    data
}

fn backends() -> Vec<Arc<dyn BackendAdapter>> {
    vec![
        Arc::new(MemoryBackend::new()),
        Arc::new(CacheBackend::new(InMemoryCache::new()).with_namespace("botstate")),
        Arc::new(TreeBackend::new("botdata")),
    ]
}

#[tokio::test]
async fn round_trip_on_every_backend() {
    for backend in backends() {
        let name = backend.backend_type();
        let storage = BotStorage::new(backend, BotStorageSettings::default()).unwrap();
        let saved = sample_state();

        let report = storage.save_data(&full_context(), &saved).await.unwrap();
        assert_eq!(report.written.len(), 3, "backend {}", name);

        let loaded = storage.get_data(&full_context()).await.unwrap();
        for kind in PartitionKind::ALL {
            assert_eq!(loaded.state(kind), saved.state(kind), "backend {}", name);
            assert_eq!(loaded.hash(kind), report.hash(kind), "backend {}", name);
        }
    }
}

#[tokio::test]
async fn second_identical_save_writes_nothing() {
    for backend in backends() {
        let recording = Arc::new(RecordingBackend::new(backend));
        let storage = BotStorage::new(recording.clone(), BotStorageSettings::default()).unwrap();

        let mut data = sample_state();
        let first = storage.save_data(&full_context(), &data).await.unwrap();
        assert_eq!(recording.write_count(), 3);

        data.apply_report(&first);
        let second = storage.save_data(&full_context(), &data).await.unwrap();
        assert_eq!(recording.write_count(), 3);
        assert!(second.is_noop());
        assert_eq!(second.skipped.len(), 3);
    }
}

#[tokio::test]
async fn loaded_state_saves_without_writes() {
    let recording = Arc::new(RecordingBackend::new(MemoryBackend::new()));
    let storage = BotStorage::new(recording.clone(), BotStorageSettings::default()).unwrap();
    storage.save_data(&full_context(), &sample_state()).await.unwrap();
    recording.reset_counts();

    let mut data = storage.get_data(&full_context()).await.unwrap();
    storage.save_data(&full_context(), &data).await.unwrap();
    assert_eq!(recording.write_count(), 0);

    data.set_state(PartitionKind::UserData, json!({"state": "changed"}));
    let report = storage.save_data(&full_context(), &data).await.unwrap();
    assert_eq!(report.written, vec![PartitionKind::UserData]);
    assert_eq!(recording.write_count(), 1);
}

#[tokio::test]
async fn nothing_eligible_returns_empty_map() {
    let recording = Arc::new(RecordingBackend::new(MemoryBackend::new()));
    let storage = BotStorage::new(recording.clone(), BotStorageSettings::default()).unwrap();

    let context = StorageContext::new().with_user("default-user");
    let data = storage.get_data(&context).await.unwrap();

    assert!(data.is_empty());
    assert_eq!(recording.read_count(), 0);
}

#[tokio::test]
async fn failed_read_discards_successful_partitions() {
    let recording = Arc::new(RecordingBackend::new(MemoryBackend::new()));
    let storage = BotStorage::new(recording.clone(), BotStorageSettings::default()).unwrap();
    storage.save_data(&full_context(), &sample_state()).await.unwrap();

    recording.set_failing("123456789");
    let result = storage.get_data(&full_context()).await;

    match result {
        Err(StorageError::Backend(msg)) => assert!(msg.contains("123456789")),
        other => panic!("expected backend error, got {:?}", other),
    }
    assert_eq!(recording.read_count(), 3);
}

#[tokio::test]
async fn failed_write_does_not_undo_sibling_writes() {
    let recording = Arc::new(RecordingBackend::new(MemoryBackend::new()).fail_on("default-user"));
    let storage = BotStorage::new(recording.clone(), BotStorageSettings::default()).unwrap();

    let result = storage.save_data(&full_context(), &sample_state()).await;
    assert!(matches!(result, Err(StorageError::Backend(_))));

    recording.clear_failures();
    let loaded = storage.get_data(&full_context()).await.unwrap();
    assert_eq!(
        loaded.state(PartitionKind::ConversationData),
        Some(&json!({"state": "public"}))
    );
    assert_eq!(loaded.state(PartitionKind::UserData), Some(&json!({})));
}

#[tokio::test]
async fn absent_state_against_empty_hash_is_skipped() {
    let recording = Arc::new(RecordingBackend::new(MemoryBackend::new()));
    let storage = BotStorage::new(recording.clone(), BotStorageSettings::default()).unwrap();
    let context = StorageContext::new()
        .with_user("default-user")
        .persist_user_data(true);

    let mut data = BotStateData::new();
    data.clear_state(PartitionKind::UserData)
        .set_hash(PartitionKind::UserData, Hasher::hash(Some(&json!({}))));
    storage.save_data(&context, &data).await.unwrap();
    assert_eq!(recording.write_count(), 0);

    data.set_hash(PartitionKind::UserData, "previous-hash");
    storage.save_data(&context, &data).await.unwrap();
    let written = recording.written_records();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].serialized_state, "{}");
    assert_eq!(written[0].key, "default-user");
}

#[tokio::test]
async fn ttl_stamps_expiry_on_every_record() {
    let memory = Arc::new(MemoryBackend::new());
    let storage = BotStorage::new(
        memory.clone(),
        BotStorageSettings::with_ttl(TtlSettings {
            user_data: Some(3600.0),
            conversation_data: Some(86400.0),
            private_conversation_data: Some(7200.0),
        }),
    )
    .unwrap();

    let now = Utc::now();
    storage
        .save_data_at(&full_context(), &sample_state(), now)
        .await
        .unwrap();

    let item = memory.item("default-user:123456789").await.unwrap();
    let expected = (now + Duration::seconds(7200)).timestamp().to_string();
    assert_eq!(item.get("expireAt"), Some(&AttributeValue::N(expected)));
    assert_eq!(
        item.get("type"),
        Some(&AttributeValue::S("privateConversationData".to_string()))
    );
}

#[tokio::test]
async fn fractional_ttl_stamps_millisecond_expiry() {
    let recording = Arc::new(RecordingBackend::new(TreeBackend::new("botdata")));
    let storage = BotStorage::new(
        recording.clone(),
        BotStorageSettings::with_ttl(TtlSettings::uniform(1.5)),
    )
    .unwrap();

    let now = Utc::now();
    storage
        .save_data_at(&full_context(), &sample_state(), now)
        .await
        .unwrap();

    let written = recording.written_records();
    assert_eq!(written.len(), 3);
    for record in written {
        assert_eq!(record.expire_at, Some(now + Duration::milliseconds(1500)));
        assert_eq!(record.ttl_seconds(), Some(2));
    }
}

#[tokio::test]
async fn tree_backend_updates_child_in_place() {
    let tree = Arc::new(TreeBackend::new("botdata"));
    let storage = BotStorage::new(tree.clone(), BotStorageSettings::default()).unwrap();

    let mut data = sample_state();
    let report = storage.save_data(&full_context(), &data).await.unwrap();
    let (push_id, _) = tree.child("default-user").await.unwrap();

    data.apply_report(&report);
    data.set_state(PartitionKind::UserData, json!({"state": "changed"}));
    storage.save_data(&full_context(), &data).await.unwrap();

    assert_eq!(tree.len().await, 3);
    assert_eq!(tree.child("default-user").await.unwrap().0, push_id);
    let loaded = storage.get_data(&full_context()).await.unwrap();
    assert_eq!(
        loaded.state(PartitionKind::UserData),
        Some(&json!({"state": "changed"}))
    );
}

#[test]
fn zero_ttl_is_rejected_at_construction() {
    let result = BotStorage::new(
        Arc::new(MemoryBackend::new()),
        BotStorageSettings::with_ttl(TtlSettings {
            user_data: Some(0.0),
            conversation_data: Some(86400.0),
            private_conversation_data: Some(86400.0),
        }),
    );
    assert!(matches!(result, Err(e) if e.is_configuration()));

    for value in [0.0, -1.0] {
        let result = BotStorage::new(
            Arc::new(MemoryBackend::new()),
            BotStorageSettings::with_ttl(TtlSettings::uniform(value)),
        );
        assert!(matches!(result, Err(StorageError::InvalidTtl { .. })), "{}", value);
    }
}

#[tokio::test]
async fn host_json_layout_round_trips() {
    let storage = BotStorage::with_backend(MemoryBackend::new());
    let incoming = json!({
        "userData": {"state": "user specific"},
        "conversationData": {"state": "public"},
        "privateConversationData": null
    });

    let data = BotStateData::from_json(&incoming).unwrap();
    storage.save_data(&full_context(), &data).await.unwrap();

    let flat = storage.get_data(&full_context()).await.unwrap().to_json();
    assert_eq!(flat["userData"], json!({"state": "user specific"}));
    assert_eq!(flat["privateConversationData"], json!({}));
    assert_eq!(
        flat["privateConversationDataHash"],
        json!(Hasher::hash(None))
    );
}
