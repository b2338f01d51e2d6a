//! Bot State Storage - persistence for conversational bot state
//!
//! A conversation context has three independent partitions of state:
//!
//! - **user data** - keyed by user id, shared across conversations
//! - **conversation data** - keyed by conversation id, shared by its members
//! - **private conversation data** - keyed by `user:conversation`
//!
//! [`storage::BotStorage`] reads and writes these partitions through a
//! pluggable [`storage::BackendAdapter`], skipping writes whose content hash
//! did not change and stamping optional per-partition expiration times.
//!
//! # Features
//!
//! ```toml
//! [dependencies]
//! botstorage = { version = "0.3" }
//! # With the MongoDB/DocumentDB backend:
//! botstorage = { version = "0.3", features = ["storage-documentdb"] }
//! # With RecordingBackend for tests:
//! botstorage = { version = "0.3", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use botstorage::storage::backend::{CacheBackend, InMemoryCache};
//! use botstorage::storage::{BotStorage, BotStorageSettings, PartitionKind, StorageContext, TtlSettings};
//! use std::sync::Arc;
//!
//! async fn example() -> botstorage::storage::StorageResult<()> {
//!     let backend = Arc::new(CacheBackend::new(InMemoryCache::new()).with_namespace("botstate"));
//!     let storage = BotStorage::new(backend, BotStorageSettings::with_ttl(TtlSettings::uniform(86400)))?;
//!
//!     let context = StorageContext::new()
//!         .with_user("default-user")
//!         .with_conversation("123456789")
//!         .persist_user_data(true)
//!         .persist_conversation_data(true);
//!
//!     let mut data = storage.get_data(&context).await?;
//!     data.set_state(PartitionKind::ConversationData, serde_json::json!({"topic": "billing"}));
//!     storage.save_data(&context, &data).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Bot state storage core and backends
pub mod storage;

/// Configuration management (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod config;

/// Recording/failing backend wrappers for tests (enabled with the `test-utils` feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::storage::{
        BackendAdapter, BotStateData, BotStorage, BotStorageSettings, PartitionKind, SaveReport,
        StorageContext, StorageError, StorageResult, TtlSettings,
    };

    #[cfg(feature = "config")]
    pub use crate::config::{Configuration, ConfigurationLoader, EnvironmentLoader};
}
