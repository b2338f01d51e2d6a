//! Public entry points: load and save the bot state of a conversation context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::backend::BackendAdapter;
use super::errors::StorageResult;
use super::fanout::FanOutExecutor;
use super::keys::ContextKeyDeriver;
use super::models::{BotStateData, SaveReport, StorageContext};
use super::ttl::{TtlConfig, TtlSettings};

/// Settings for [`BotStorage`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotStorageSettings {
    /// Per-partition TTL. `None` disables expiration.
    #[serde(default)]
    pub ttl: Option<TtlSettings>,
}

impl BotStorageSettings {
    /// Settings with expiration enabled
    pub fn with_ttl(ttl: TtlSettings) -> Self {
        Self { ttl: Some(ttl) }
    }
}

/// Persists user, conversation and private conversation data to a backend.
///
/// Each call is independent: the storage keeps no session state between
/// calls and never retries. Reads and writes of one call run concurrently.
pub struct BotStorage {
    backend: Arc<dyn BackendAdapter>,
    executor: FanOutExecutor,
}

impl BotStorage {
    /// Create a storage over `backend`.
    ///
    /// TTL settings are validated here; invalid settings fail construction.
    pub fn new(backend: Arc<dyn BackendAdapter>, settings: BotStorageSettings) -> StorageResult<Self> {
        let ttl = settings.ttl.map(TtlConfig::try_from).transpose()?;

        info!(
            target: "botstorage::storage",
            backend = backend.backend_type(),
            ttl_enabled = ttl.is_some(),
            "Bot storage initialized"
        );

        Ok(Self {
            backend,
            executor: FanOutExecutor::new(ttl),
        })
    }

    /// Create a storage without expiration
    pub fn with_backend<B: BackendAdapter + 'static>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            executor: FanOutExecutor::default(),
        }
    }

    /// The backend every partition is stored in
    pub fn backend(&self) -> &dyn BackendAdapter {
        self.backend.as_ref()
    }

    /// Validated TTL, if expiration is enabled
    pub fn ttl(&self) -> Option<&TtlConfig> {
        self.executor.ttl()
    }

    /// Load every partition the context makes eligible.
    ///
    /// Returns an empty map when nothing is eligible. If any read fails the
    /// whole call fails and no partial data is returned.
    pub async fn get_data(&self, context: &StorageContext) -> StorageResult<BotStateData> {
        let reads = ContextKeyDeriver::derive_reads(context);
        if reads.is_empty() {
            return Ok(BotStateData::new());
        }

        debug!(target: "botstorage::storage", partitions = reads.len(), "Reading bot state");
        self.executor.read_all(self.backend.as_ref(), reads).await
    }

    /// Write the partitions whose content changed since the hash carried in `data`
    pub async fn save_data(
        &self,
        context: &StorageContext,
        data: &BotStateData,
    ) -> StorageResult<SaveReport> {
        self.save_data_at(context, data, Utc::now()).await
    }

    /// [`BotStorage::save_data`] with an explicit modification time
    pub async fn save_data_at(
        &self,
        context: &StorageContext,
        data: &BotStateData,
        now: DateTime<Utc>,
    ) -> StorageResult<SaveReport> {
        let plan = self.executor.plan_writes(context, data, now);

        debug!(
            target: "botstorage::storage",
            writes = plan.records.len(),
            skipped = plan.skipped.len(),
            "Saving bot state"
        );

        if !plan.records.is_empty() {
            self.executor
                .write_all(self.backend.as_ref(), &plan.records)
                .await?;
        }

        Ok(SaveReport {
            written: plan.records.iter().map(|r| r.partition_kind).collect(),
            skipped: plan.skipped,
            hashes: plan.hashes,
        })
    }
}

impl std::fmt::Debug for BotStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotStorage")
            .field("backend", &self.backend.backend_type())
            .field("ttl", &self.executor.ttl())
            .finish()
    }
}
