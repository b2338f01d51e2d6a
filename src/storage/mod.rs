//! Bot State Storage
//!
//! Persists the three partitions of conversational bot state (user data,
//! conversation data and private conversation data) into a pluggable backend.
//!
//! This module provides:
//! - Key derivation from the caller's conversation context
//! - SHA-256 content hashing to skip unchanged writes
//! - Per-partition expiration from TTL settings
//! - Concurrent per-partition reads and writes with first-error-wins semantics
//!
//! ## Usage
//!
//! ```rust,no_run
//! use botstorage::storage::backend::MemoryBackend;
//! use botstorage::storage::{BotStorage, PartitionKind, StorageContext, StorageResult};
//!
//! async fn example() -> StorageResult<()> {
//!     let storage = BotStorage::with_backend(MemoryBackend::new());
//!     let context = StorageContext::new()
//!         .with_user("default-user")
//!         .with_conversation("123456789")
//!         .persist_user_data(true);
//!
//!     let mut data = storage.get_data(&context).await?;
//!     data.set_state(PartitionKind::UserData, serde_json::json!({"name": "ada"}));
//!     let report = storage.save_data(&context, &data).await?;
//!     data.apply_report(&report);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod errors;
pub mod facade;
pub mod fanout;
pub mod hasher;
pub mod keys;
pub mod models;
pub mod ttl;

// Re-export key types for convenience
pub use backend::{BackendAdapter, BackendBuilder};
pub use errors::{StorageError, StorageResult};
pub use facade::{BotStorage, BotStorageSettings};
pub use fanout::{FanOutExecutor, WritePlan};
pub use hasher::{HashComparison, Hasher};
pub use keys::ContextKeyDeriver;
pub use models::{
    BotStateData, PartitionEntry, PartitionKind, PartitionState, ReadDescriptor, SaveReport,
    StorageContext, StorageRecord, StoredState,
};
pub use ttl::{ExpirationPolicy, TtlConfig, TtlSettings};
