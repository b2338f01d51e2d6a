//! Mock backend wrappers for testing

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::storage::backend::BackendAdapter;
use crate::storage::errors::{StorageError, StorageResult};
use crate::storage::models::{StorageRecord, StoredState};

/// Wraps a backend, counting calls and failing chosen keys
pub struct RecordingBackend<B> {
    inner: B,
    reads: AtomicUsize,
    writes: AtomicUsize,
    written: Mutex<Vec<StorageRecord>>,
    failing_keys: Mutex<HashSet<String>>,
    latency: Option<Duration>,
}

impl<B: BackendAdapter> RecordingBackend<B> {
    /// Wrap `inner` with no failures and no latency
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
            failing_keys: Mutex::new(HashSet::new()),
            latency: None,
        }
    }

    /// Fail every read and write of `key`
    pub fn fail_on(self, key: impl Into<String>) -> Self {
        self.set_failing(key);
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Start failing `key` on an already shared wrapper
    pub fn set_failing(&self, key: impl Into<String>) {
        self.failing_keys.lock().unwrap().insert(key.into());
    }

    /// Stop failing every key
    pub fn clear_failures(&self) {
        self.failing_keys.lock().unwrap().clear();
    }

    /// The wrapped backend
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Reads attempted, failed ones included
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Writes attempted, failed ones included
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Records passed to successful writes, in completion order
    pub fn written_records(&self) -> Vec<StorageRecord> {
        self.written.lock().unwrap().clone()
    }

    /// Zero the counters and forget recorded writes
    pub fn reset_counts(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
        self.written.lock().unwrap().clear();
    }

    fn check(&self, key: &str) -> StorageResult<()> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(StorageError::backend(format!(
                "Something went wrong for key {}",
                key
            )));
        }
        Ok(())
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl<B: BackendAdapter> BackendAdapter for RecordingBackend<B> {
    fn backend_type(&self) -> &'static str {
        self.inner.backend_type()
    }

    async fn read(&self, key: &str) -> StorageResult<Option<StoredState>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check(key)?;
        self.inner.read(key).await
    }

    async fn write(&self, record: &StorageRecord) -> StorageResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.check(&record.key)?;
        self.inner.write(record).await?;
        self.written.lock().unwrap().push(record.clone());
        Ok(())
    }
}
