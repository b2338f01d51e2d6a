//! DocumentDB/MongoDB Storage Backend
//!
//! Stores one document per key:
//!
//! ```text
//! { _id, data, hash, type, lastModified, expireAt }
//! ```
//!
//! `lastModified` and `expireAt` are BSON dates so a TTL index on `expireAt`
//! lets the server purge expired state on its own.
//!
//! ## Usage
//!
//! Enable the `storage-documentdb` feature in Cargo.toml:
//!
//! ```toml
//! botstorage = { version = "0.3", features = ["storage-documentdb"] }
//! ```
//!
//! ```rust,no_run
//! use botstorage::storage::backend::DocumentDbBackend;
//!
//! async fn example() -> botstorage::storage::StorageResult<()> {
//!     let backend = DocumentDbBackend::new(
//!         "mongodb://localhost:27017",
//!         "bot_db",
//!         "botdata"
//!     ).await?;
//!     backend.ensure_ttl_index().await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::{ClientOptions, IndexOptions},
    Client, Collection, IndexModel,
};
use std::time::Duration;
use tracing::info;

use super::traits::BackendAdapter;
use crate::storage::errors::{StorageError, StorageResult};
use crate::storage::models::{StorageRecord, StoredState};

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "botdata";

/// DocumentDB/MongoDB storage backend
pub struct DocumentDbBackend {
    client: Client,
    collection: Collection<Document>,
    database_name: String,
}

impl DocumentDbBackend {
    /// Create a new DocumentDB storage backend
    ///
    /// # Arguments
    /// * `connection_string` - MongoDB/DocumentDB connection string
    /// * `database` - Database name
    /// * `collection` - Collection name
    pub async fn new(
        connection_string: &str,
        database: &str,
        collection: &str,
    ) -> StorageResult<Self> {
        if collection.is_empty() {
            return Err(StorageError::configuration(
                "DocumentDB backend requires a collection name",
            ));
        }

        let client_options = ClientOptions::parse(connection_string)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let client = Client::with_options(client_options)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(Self::from_client(client, database, collection))
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client, database: &str, collection: &str) -> Self {
        let collection = client.database(database).collection::<Document>(collection);
        Self {
            client,
            collection,
            database_name: database.to_string(),
        }
    }

    /// Get the collection (for advanced operations)
    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    /// Create the TTL index on `expireAt` so expired documents are removed server-side
    pub async fn ensure_ttl_index(&self) -> StorageResult<()> {
        let options = IndexOptions::builder()
            .expire_after(Duration::from_secs(0))
            .name("expireAt_ttl".to_string())
            .build();
        let model = IndexModel::builder()
            .keys(doc! { "expireAt": 1 })
            .options(options)
            .build();

        self.collection
            .create_index(model)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        info!(
            target: "botstorage::storage",
            collection = %self.collection.name(),
            "TTL index on expireAt ensured"
        );
        Ok(())
    }

    fn to_document(record: &StorageRecord) -> Document {
        let mut document = doc! {
            "_id": record.key.as_str(),
            "data": record.serialized_state.as_str(),
            "hash": record.hash.as_str(),
            "type": record.partition_kind.as_str(),
            "lastModified": BsonDateTime::from_millis(record.last_modified.timestamp_millis()),
        };
        if let Some(expire_at) = record.expire_at {
            document.insert(
                "expireAt",
                BsonDateTime::from_millis(expire_at.timestamp_millis()),
            );
        }
        document
    }
}

#[async_trait]
impl BackendAdapter for DocumentDbBackend {
    fn backend_type(&self) -> &'static str {
        "documentdb"
    }

    async fn is_available(&self) -> bool {
        self.client
            .database(&self.database_name)
            .run_command(doc! { "ping": 1 })
            .await
            .is_ok()
    }

    async fn read(&self, key: &str) -> StorageResult<Option<StoredState>> {
        let document = self
            .collection
            .find_one(doc! { "_id": key })
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(document.map(|document| {
            let data = document.get_str("data").unwrap_or("{}");
            let hash = document.get_str("hash").ok().map(str::to_string);
            StoredState::new(data, hash)
        }))
    }

    async fn write(&self, record: &StorageRecord) -> StorageResult<()> {
        self.collection
            .replace_one(doc! { "_id": record.key.as_str() }, Self::to_document(record))
            .upsert(true)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }
}
