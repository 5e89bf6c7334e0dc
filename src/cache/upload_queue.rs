//! [`AsyncUploadQueue`]: a bounded, byte-counted, deduplicated
//! write-behind queue with read-through.
//!
//! A `tokio::spawn` background task with a shutdown broadcast, and a
//! `DashMap`-backed registry for the dedup map.

use super::entry::CacheEntryMetadata;
use super::error::ProviderError;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    QueueFull,
    AlreadyPresent,
}

struct QueuedEntry {
    data: Bytes,
    metadata: CacheEntryMetadata,
    size: u64,
}

/// Byte-bounded, deduplicated queue of deferred provider stores. Must be
/// held behind an `Arc` — enqueued stores run as detached tasks that need
/// to reach back into the queue's map and byte counter on completion.
pub struct AsyncUploadQueue {
    max_bytes: u64,
    queued_bytes: AtomicU64,
    entries: DashMap<String, QueuedEntry>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl AsyncUploadQueue {
    pub fn new(max_bytes: u64) -> Arc<Self> {
        Arc::new(Self {
            max_bytes,
            queued_bytes: AtomicU64::new(0),
            entries: DashMap::new(),
            in_flight: Mutex::new(Vec::new()),
        })
    }

    pub fn queued_bytes(&self) -> u64 {
        self.queued_bytes.load(Ordering::SeqCst)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Reserves `data.len()` bytes against the budget, inserts a dedup
    /// entry, and spawns a background task that awaits `store_fn` and
    /// then unconditionally removes the entry and releases the
    /// reservation — whether the store succeeded or not.
    pub fn try_enqueue<F, Fut>(
        self: &Arc<Self>,
        key: &str,
        data: Bytes,
        metadata: CacheEntryMetadata,
        store_fn: F,
    ) -> EnqueueOutcome
    where
        F: FnOnce(Bytes, CacheEntryMetadata) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ProviderError>> + Send + 'static,
    {
        let size = data.len() as u64;
        let new_total = self.queued_bytes.fetch_add(size, Ordering::SeqCst) + size;
        if new_total > self.max_bytes {
            self.queued_bytes.fetch_sub(size, Ordering::SeqCst);
            return EnqueueOutcome::QueueFull;
        }

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => {
                self.queued_bytes.fetch_sub(size, Ordering::SeqCst);
                EnqueueOutcome::AlreadyPresent
            }
            Entry::Vacant(vacant) => {
                let this = Arc::clone(self);
                let key_owned = key.to_string();
                let data_for_task = data.clone();
                let metadata_for_task = metadata.clone();
                let handle = tokio::spawn(async move {
                    let _ = store_fn(data_for_task, metadata_for_task).await;
                    this.entries.remove(&key_owned);
                    this.queued_bytes.fetch_sub(size, Ordering::SeqCst);
                });
                self.in_flight.lock().push(handle);
                vacant.insert(QueuedEntry {
                    data,
                    metadata,
                    size,
                });
                EnqueueOutcome::Enqueued
            }
        }
    }

    /// Read-through: returns whatever an enqueued entry holds even before
    /// its background store completes.
    pub fn try_get(&self, key: &str) -> Option<(Bytes, CacheEntryMetadata)> {
        self.entries
            .get(key)
            .map(|e| (e.data.clone(), e.metadata.clone()))
    }

    /// Awaits every task outstanding at the moment of the call. New
    /// enqueues made concurrently are not included in this wait.
    pub async fn drain(&self) {
        let handles: Vec<_> = {
            let mut guard = self.in_flight.lock();
            std::mem::take(&mut *guard)
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Cancels outstanding stores and best-effort awaits their
    /// completion. Exceptions/panics during disposal are swallowed.
    pub async fn dispose(&self) {
        let handles: Vec<_> = {
            let mut guard = self.in_flight.lock();
            std::mem::take(&mut *guard)
        };
        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            let _ = handle.await;
        }
        self.entries.clear();
        self.queued_bytes.store(0, Ordering::SeqCst);
    }
}
