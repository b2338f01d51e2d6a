//! Concurrent per-partition reads and writes
//!
//! Every partition of a call becomes one backend operation. All operations of
//! a batch run concurrently and the batch settles only once each of them has
//! finished. If any fails, the first failure (in completion order) is returned
//! and the successful results are discarded. Writes that already landed are
//! not rolled back: partitions are independent and there is no cross-partition
//! atomicity.

use chrono::{DateTime, Utc};
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, warn};

use super::backend::BackendAdapter;
use super::errors::{StorageError, StorageResult};
use super::hasher::{HashComparison, Hasher};
use super::keys::ContextKeyDeriver;
use super::models::{
    BotStateData, PartitionEntry, PartitionKind, ReadDescriptor, StorageContext, StorageRecord,
};
use super::ttl::{ExpirationPolicy, TtlConfig};

/// Records to write plus the partitions left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WritePlan {
    /// One record per changed partition
    pub records: Vec<StorageRecord>,
    /// Partitions whose hash is unchanged
    pub skipped: Vec<PartitionKind>,
    /// Fresh hash of every eligible partition, written or not
    pub hashes: BTreeMap<PartitionKind, String>,
}

/// Runs a batch of partition operations against a backend
#[derive(Debug, Clone, Default)]
pub struct FanOutExecutor {
    ttl: Option<TtlConfig>,
}

impl FanOutExecutor {
    /// Create an executor; `None` disables expiration
    pub fn new(ttl: Option<TtlConfig>) -> Self {
        Self { ttl }
    }

    /// Validated TTL, if expiration is enabled
    pub fn ttl(&self) -> Option<&TtlConfig> {
        self.ttl.as_ref()
    }

    /// Read every descriptor concurrently.
    ///
    /// A missing key yields an empty object with no hash.
    pub async fn read_all<B>(
        &self,
        backend: &B,
        descriptors: Vec<ReadDescriptor>,
    ) -> StorageResult<BotStateData>
    where
        B: BackendAdapter + ?Sized,
    {
        let reads = descriptors
            .into_iter()
            .map(|descriptor| read_partition(backend, descriptor));

        let entries = settle_all(reads).await?;

        let mut data = BotStateData::new();
        for (kind, entry) in entries {
            data.insert(kind, entry);
        }
        Ok(data)
    }

    /// Build the records for every eligible partition whose hash changed
    pub fn plan_writes(
        &self,
        context: &StorageContext,
        data: &BotStateData,
        now: DateTime<Utc>,
    ) -> WritePlan {
        let mut plan = WritePlan::default();

        for (kind, key) in ContextKeyDeriver::eligible(context) {
            let entry = data.get(kind);
            let state = entry.and_then(|e| e.state.as_ref());
            let previous_hash = entry.and_then(|e| e.hash.as_deref());

            let serialized_state = Hasher::serialize(state);
            let hash = Hasher::digest(&serialized_state);
            plan.hashes.insert(kind, hash.clone());

            match Hasher::compare(&hash, previous_hash) {
                HashComparison::Unchanged => {
                    debug!(target: "botstorage::storage", partition = %kind, key = %key, "Skipping unchanged partition");
                    plan.skipped.push(kind);
                }
                HashComparison::Changed => plan.records.push(StorageRecord {
                    key,
                    serialized_state,
                    hash,
                    partition_kind: kind,
                    last_modified: now,
                    expire_at: ExpirationPolicy::expire_at(kind, self.ttl.as_ref(), now),
                }),
            }
        }

        plan
    }

    /// Write every record concurrently
    pub async fn write_all<B>(&self, backend: &B, records: &[StorageRecord]) -> StorageResult<()>
    where
        B: BackendAdapter + ?Sized,
    {
        let writes = records.iter().map(|record| async move {
            backend.write(record).await.map_err(|e| {
                warn!(
                    target: "botstorage::storage",
                    partition = %record.partition_kind,
                    key = %record.key,
                    error = %e,
                    "Partition write failed"
                );
                e
            })
        });

        settle_all(writes).await.map(|_| ())
    }
}

async fn read_partition<B>(
    backend: &B,
    descriptor: ReadDescriptor,
) -> StorageResult<(PartitionKind, PartitionEntry)>
where
    B: BackendAdapter + ?Sized,
{
    let ReadDescriptor {
        key,
        partition_kind,
    } = descriptor;

    let stored = backend.read(&key).await.map_err(|e| {
        warn!(
            target: "botstorage::storage",
            partition = %partition_kind,
            key = %key,
            error = %e,
            "Partition read failed"
        );
        e
    })?;

    let entry = match stored {
        None => PartitionEntry {
            state: Some(json!({})),
            hash: None,
        },
        Some(stored) => {
            let state: Value = serde_json::from_str(&stored.serialized_state).map_err(|e| {
                StorageError::deserialization(format!(
                    "{} stored under '{}' is not valid JSON: {}",
                    partition_kind, key, e
                ))
            })?;
            PartitionEntry {
                state: Some(state),
                hash: stored.hash,
            }
        }
    };

    Ok((partition_kind, entry))
}

/// Drive all futures to completion; first error wins
async fn settle_all<F, T>(operations: impl IntoIterator<Item = F>) -> StorageResult<Vec<T>>
where
    F: Future<Output = StorageResult<T>>,
{
    let mut pending: FuturesUnordered<F> = operations.into_iter().collect();
    let mut results = Vec::with_capacity(pending.len());
    let mut first_error = None;

    while let Some(outcome) = pending.next().await {
        match outcome {
            Ok(value) => results.push(value),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => {
                debug!(target: "botstorage::storage", error = %e, "Suppressing additional batch error")
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(results),
    }
}
