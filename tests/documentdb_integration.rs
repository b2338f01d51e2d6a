//! Integration test for the DocumentDB backend with a local container
//!
//! Run with: cargo test --features storage-documentdb --test documentdb_integration -- --ignored --nocapture

#[cfg(feature = "storage-documentdb")]
mod tests {
    use botstorage::storage::backend::{BackendAdapter, DocumentDbBackend};
    use botstorage::storage::{
        BotStateData, BotStorage, BotStorageSettings, PartitionKind, StorageContext, TtlSettings,
    };
    use serde_json::json;
    use std::sync::Arc;

    const TEST_URL: &str = "mongodb://localhost:27017";
    const TEST_DB: &str = "test_botstorage";
    const TEST_COLLECTION: &str = "test_botdata";

    async fn backend() -> DocumentDbBackend {
        DocumentDbBackend::new(TEST_URL, TEST_DB, TEST_COLLECTION)
            .await
            .expect("Failed to create backend")
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB instance
    async fn test_documentdb_connection() {
        let backend = backend().await;
        assert!(backend.is_available().await, "Backend not available");
        assert_eq!(backend.backend_type(), "documentdb");
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB instance
    async fn test_documentdb_round_trip_with_ttl() {
        let backend = Arc::new(backend().await);
        backend.ensure_ttl_index().await.expect("Failed to create TTL index");

        let storage = BotStorage::new(
            backend.clone(),
            BotStorageSettings::with_ttl(TtlSettings::uniform(3600)),
        )
        .expect("Failed to create storage");

        let context = StorageContext::new()
            .with_user("integration-user")
            .with_conversation("integration-conversation")
            .persist_user_data(true)
            .persist_conversation_data(true);

        let mut data = BotStateData::new();
        data.set_state(PartitionKind::UserData, json!({"name": "ada"}));
        data.set_state(PartitionKind::ConversationData, json!({"topic": "billing"}));

        let report = storage.save_data(&context, &data).await.expect("Failed to save");
        assert_eq!(report.written.len(), 3);

        let loaded = storage.get_data(&context).await.expect("Failed to load");
        assert_eq!(loaded.state(PartitionKind::UserData), Some(&json!({"name": "ada"})));
        assert_eq!(
            loaded.hash(PartitionKind::ConversationData),
            report.hash(PartitionKind::ConversationData)
        );

        let document = backend
            .collection()
            .find_one(mongodb::bson::doc! { "_id": "integration-user" })
            .await
            .expect("Failed to query")
            .expect("Document missing");
        assert!(document.get_datetime("expireAt").is_ok());
    }
}
