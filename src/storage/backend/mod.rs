//! Storage Backend Abstraction
//!
//! The storage core talks to every backing store through [`BackendAdapter`].
//! Each adapter maps the same record onto its own wire format.
//!
//! ```text
//! ┌─────────────────────┐
//! │     BotStorage      │
//! │  (get/save facade)  │
//! └──────────┬──────────┘
//!            │
//! ┌──────────▼──────────┐
//! │   BackendAdapter    │  <-- Trait
//! │      (async)        │
//! └──────────┬──────────┘
//!            │
//!     ┌──────┼──────────┬──────────────┐
//!     │      │          │              │
//! ┌───▼───┐ ┌▼──────┐ ┌─▼─────┐ ┌──────▼────┐
//! │Memory │ │ Cache │ │ Tree  │ │ DocumentDB│
//! │Backend│ │Backend│ │Backend│ │  Backend  │
//! └───────┘ └───────┘ └───────┘ └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use botstorage::storage::backend::{BackendAdapter, MemoryBackend};
//!
//! async fn example() -> botstorage::storage::StorageResult<()> {
//!     let backend = MemoryBackend::new();
//!     let stored = backend.read("default-user").await?;
//!     assert!(stored.is_none());
//!     Ok(())
//! }
//! ```

mod builder;
mod cache_backend;
mod memory_backend;
mod traits;
mod tree_backend;

pub use builder::BackendBuilder;
pub use cache_backend::{CacheBackend, CacheClient, InMemoryCache};
pub use memory_backend::{AttributeValue, Item, MemoryBackend};
pub use traits::*;
pub use tree_backend::{TreeBackend, TreeNode};

#[cfg(feature = "storage-documentdb")]
mod documentdb_backend;

#[cfg(feature = "storage-documentdb")]
pub use documentdb_backend::DocumentDbBackend;
