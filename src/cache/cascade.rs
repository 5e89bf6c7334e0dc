//! [`CacheCascade`]: the orchestrator that fans a request across tiers in
//! registered order, coalesces concurrent misses, and distributes newly
//! discovered or created entries to subscribing tiers.

use super::bloom::RotatingBloomFilter;
use super::coalescer::RequestCoalescer;
use super::entry::{
    CacheEntryMetadata, CachePayload, CacheProviderCapabilities, CacheResult, CacheStatus,
    CacheStoreReason,
};
use super::events::CacheEvent;
use super::error::CacheError;
use super::key::CacheKey;
use super::provider::CacheProvider;
use super::upload_queue::{AsyncUploadQueue, EnqueueOutcome};
use crate::config::CascadeConfig;
use bytes::Bytes;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// The reserved key under which the bloom filter's own state is
/// checkpointed.
pub const BLOOM_CHECKPOINT_SOURCE: &str = "__meta/bloom";
pub const BLOOM_CHECKPOINT_VARIANT: &str = "__meta/bloom/state";
pub const BLOOM_CONTENT_TYPE: &str = "application/x-bloom-filter";

/// The per-key tuple a coalesced factory call resolves to: the leader's
/// (or a prior direct call's) discovery, plus whether it was a fresh
/// creation (so distribution knows to use [`CacheStoreReason::FreshlyCreated`]).
#[derive(Clone)]
enum LeaderOutcome {
    Found {
        data: Bytes,
        metadata: CacheEntryMetadata,
    },
    Created {
        data: Bytes,
        metadata: CacheEntryMetadata,
    },
    FactoryReturnedNull,
}

type Coalescer = RequestCoalescer<LeaderOutcome>;

struct HitData {
    payload: CachePayload,
    metadata: CacheEntryMetadata,
    status: CacheStatus,
    provider_name: String,
}

/// An observer callback invoked for every [`CacheEvent`], in addition to
/// the broadcast channel returned by [`CacheCascade::subscribe_events`].
pub type EventObserver = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

pub struct CacheCascade {
    providers: Vec<Arc<dyn CacheProvider>>,
    upload_queue: Arc<AsyncUploadQueue>,
    bloom: Arc<RotatingBloomFilter>,
    coalescer: Coalescer,
    config: CascadeConfig,
    event_tx: broadcast::Sender<CacheEvent>,
    observer: Option<EventObserver>,
}

impl CacheCascade {
    /// Registers `providers` in fetch-probe order. Registration is not
    /// concurrency-safe and must complete before any `get_or_create`
    /// call: the provider map is read-only after registration.
    pub fn new(
        providers: Vec<Arc<dyn CacheProvider>>,
        config: CascadeConfig,
        observer: Option<EventObserver>,
    ) -> Arc<Self> {
        let bloom = Arc::new(RotatingBloomFilter::new(
            config.bloom.estimated_items,
            config.bloom.false_positive_rate,
            config.bloom.slots,
        ));
        let upload_queue = AsyncUploadQueue::new(config.max_upload_queue_bytes);
        let (event_tx, _rx) = broadcast::channel(256);
        Arc::new(Self {
            providers,
            upload_queue,
            bloom,
            coalescer: RequestCoalescer::new(),
            config,
            event_tx,
            observer,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CacheEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: CacheEvent) {
        let _ = self.event_tx.send(event.clone());
        if let Some(observer) = &self.observer {
            // A faulty observer must never crash the cascade.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| observer(&event)));
            if result.is_err() {
                warn!("cache event observer panicked, event was {:?}", event.kind);
            }
        }
    }

    fn queue_key(string_key: &str, provider_name: &str) -> String {
        format!("{string_key}:{provider_name}")
    }

    /// The sequential fetch pass across registered providers. Returns the hit
    /// (if any), the index of the provider that produced it (`None` for a
    /// bare-key upload-queue hit or when nothing was found), and the set
    /// of provider indices that were directly checked (fetched, or ruled
    /// out by the bloom gate) during the pass.
    async fn fetch_sequential(
        &self,
        key: &CacheKey,
        string_key: &str,
    ) -> (Option<HitData>, Option<usize>, HashSet<usize>) {
        let mut checked_missed = HashSet::new();

        for (idx, provider) in self.providers.iter().enumerate() {
            let qkey = Self::queue_key(string_key, provider.name());
            if let Some((data, metadata)) = self.upload_queue.try_get(&qkey) {
                return (
                    Some(HitData {
                        payload: CachePayload::Buffered(data),
                        metadata,
                        status: CacheStatus::QueueHit,
                        provider_name: provider.name().to_string(),
                    }),
                    Some(idx),
                    checked_missed,
                );
            }

            let caps = provider.capabilities();
            if !caps.is_local() && !self.bloom.probably_contains(&qkey) {
                checked_missed.insert(idx);
                continue;
            }

            match provider.fetch(key).await {
                Ok(Some(result)) => {
                    let status = classify_hit(caps);
                    return (
                        Some(HitData {
                            payload: result.payload,
                            metadata: result.metadata,
                            status,
                            provider_name: provider.name().to_string(),
                        }),
                        Some(idx),
                        checked_missed,
                    );
                }
                Ok(None) => {
                    checked_missed.insert(idx);
                }
                Err(err) => {
                    self.emit(CacheEvent::error(
                        string_key,
                        Some(provider.name().to_string()),
                        err.to_string(),
                    ));
                    checked_missed.insert(idx);
                }
            }
        }

        // All providers were probed and missed; check the bare-key
        // upload-queue slot as a last resort.
        if let Some((data, metadata)) = self.upload_queue.try_get(string_key) {
            return (
                Some(HitData {
                    payload: CachePayload::Buffered(data),
                    metadata,
                    status: CacheStatus::QueueHit,
                    provider_name: "upload-queue".to_string(),
                }),
                None,
                checked_missed,
            );
        }

        (None, None, checked_missed)
    }

    fn store_reason_for(
        &self,
        idx: usize,
        provider: &Arc<dyn CacheProvider>,
        string_key: &str,
        hit_index: Option<usize>,
        checked_missed: &HashSet<usize>,
    ) -> CacheStoreReason {
        if Some(idx) == hit_index {
            unreachable!("the hit provider is never asked to subscribe to its own hit");
        }
        if checked_missed.contains(&idx) {
            return CacheStoreReason::Missed;
        }
        let caps = provider.capabilities();
        if !caps.is_local() {
            let qkey = Self::queue_key(string_key, provider.name());
            if !self.bloom.probably_contains(&qkey) {
                return CacheStoreReason::Missed;
            }
        }
        CacheStoreReason::NotQueried
    }

    /// Distributes a discovered or created entry to every subscribing
    /// provider other than the one that served it.
    async fn distribute(
        self: &Arc<Self>,
        key: &CacheKey,
        string_key: &str,
        hit_index: Option<usize>,
        checked_missed: &HashSet<usize>,
        data: &Bytes,
        metadata: &CacheEntryMetadata,
        freshly_created: bool,
    ) {
        let size_bytes = data.len() as i64;
        for (idx, provider) in self.providers.iter().enumerate() {
            if Some(idx) == hit_index {
                continue;
            }
            let reason = if freshly_created {
                CacheStoreReason::FreshlyCreated
            } else {
                self.store_reason_for(idx, provider, string_key, hit_index, checked_missed)
            };

            if !provider.wants_to_store(key, size_bytes, reason).await {
                continue;
            }

            let caps = provider.capabilities();
            let qkey = Self::queue_key(string_key, provider.name());

            if caps.requires_inline_execution {
                let provider = Arc::clone(provider);
                let key = *key;
                let data = data.clone();
                let metadata = metadata.clone();
                let cascade = Arc::clone(self);
                let string_key_owned = string_key.to_string();
                tokio::spawn(async move {
                    match provider.store(&key, data, metadata).await {
                        Ok(()) => cascade.emit(CacheEvent::store(string_key_owned, provider.name())),
                        Err(err) => cascade.emit(CacheEvent::error(
                            string_key_owned,
                            Some(provider.name().to_string()),
                            err.to_string(),
                        )),
                    }
                });
            } else {
                let provider_for_task = Arc::clone(provider);
                let key_for_task = *key;
                let outcome = self.upload_queue.try_enqueue(
                    &qkey,
                    data.clone(),
                    metadata.clone(),
                    move |data, metadata| async move {
                        provider_for_task.store(&key_for_task, data, metadata).await
                    },
                );
                match outcome {
                    EnqueueOutcome::Enqueued | EnqueueOutcome::AlreadyPresent => {
                        // Both outcomes mean this provider accepted the
                        // store: `AlreadyPresent` just means an identical
                        // upload for the same key is already in flight, so
                        // the queue dedups the work without dropping the
                        // caller's store. Each accepting caller still gets
                        // its own store event.
                        if !caps.is_local() {
                            self.bloom.insert(&qkey);
                        }
                        self.emit(CacheEvent::store(string_key, provider.name()));
                    }
                    EnqueueOutcome::QueueFull => {
                        self.emit(CacheEvent::store_dropped(string_key, provider.name(), "Upload queue full"));
                    }
                }
            }
        }
    }

    /// The atomic read-or-create entry point. `factory`
    /// produces `Some((data, metadata))` on success or `None` if it has
    /// nothing to offer (surfaced as `CacheResult::Error`).
    pub async fn get_or_create<F, Fut>(self: &Arc<Self>, key: &CacheKey, factory: F) -> CacheResult
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Option<(Bytes, CacheEntryMetadata)>> + Send + 'static,
    {
        let string_key = key.to_string_key();
        let started = Instant::now();

        let (hit, hit_index, checked_missed) = self.fetch_sequential(key, &string_key).await;

        if let Some(hit) = hit {
            self.emit(CacheEvent::hit(string_key.as_str(), hit.provider_name.as_str(), started.elapsed()));
            if let CachePayload::Buffered(ref data) = hit.payload {
                self.distribute(key, &string_key, hit_index, &checked_missed, data, &hit.metadata, false)
                    .await;
            }
            return CacheResult::hit(hit.status, hit.payload, hit.metadata.content_type, hit.provider_name, started.elapsed());
        }

        self.emit(CacheEvent::miss(string_key.as_str()));

        let outcome = if self.config.enable_request_coalescing {
            let timeout = Duration::from_millis(self.config.coalescing_timeout_ms());
            let cascade = Arc::clone(self);
            let key_owned = *key;
            let (settled, outcome) = self
                .coalescer
                .try_execute(&string_key, timeout, move || {
                    run_leader(cascade, key_owned, factory)
                })
                .await;
            if !settled {
                return CacheResult::timeout();
            }
            outcome.expect("settled coalesced call always carries a result")
        } else {
            run_leader(Arc::clone(self), *key, factory).await
        };

        match outcome {
            LeaderOutcome::Found { data, metadata } => {
                let content_type = metadata.content_type.clone();
                self.distribute(key, &string_key, None, &checked_missed, &data, &metadata, false)
                    .await;
                CacheResult::hit(CacheStatus::QueueHit, CachePayload::Buffered(data), content_type, "upload-queue", started.elapsed())
            }
            LeaderOutcome::Created { data, metadata } => {
                let content_type = metadata.content_type.clone();
                self.distribute(key, &string_key, None, &checked_missed, &data, &metadata, true)
                    .await;
                CacheResult::created(data, content_type, started.elapsed())
            }
            LeaderOutcome::FactoryReturnedNull => CacheResult::error("Factory returned null"),
        }
    }

    /// Best-effort invalidation across every tier. Per-provider errors
    /// are contained and reported as events, never propagated.
    pub async fn invalidate(&self, key: &CacheKey) {
        let string_key = key.to_string_key();
        for provider in &self.providers {
            match provider.invalidate(key).await {
                Ok(_) => {}
                Err(err) => self.emit(CacheEvent::error(string_key.as_str(), Some(provider.name().to_string()), err.to_string())),
            }
        }
    }

    /// Purges every entry derived from `source_hash`, summing the
    /// per-provider counts. Best-effort on a per-provider error.
    pub async fn purge_by_source(&self, source_hash: [u8; 16]) -> u32 {
        let mut total = 0u32;
        for provider in &self.providers {
            match provider.purge_by_source(source_hash).await {
                Ok(count) => total += count,
                Err(err) => self.emit(CacheEvent::error(
                    hex::encode(source_hash),
                    Some(provider.name().to_string()),
                    err.to_string(),
                )),
            }
        }
        total
    }

    fn bloom_checkpoint_key(&self) -> CacheKey {
        CacheKey::from_strings(BLOOM_CHECKPOINT_SOURCE, BLOOM_CHECKPOINT_VARIANT)
    }

    fn first_local_durable_provider(&self) -> Option<&Arc<dyn CacheProvider>> {
        self.providers
            .iter()
            .find(|p| p.capabilities().is_local() && !p.capabilities().requires_inline_execution)
    }

    /// Persists the bloom filter's byte image under the reserved
    /// `("__meta/bloom", "__meta/bloom/state")` key using the first local,
    /// non-inline provider. Absorbs failures.
    pub async fn checkpoint_bloom(&self) {
        let Some(provider) = self.first_local_durable_provider() else {
            debug!("no local durable provider registered; skipping bloom checkpoint");
            return;
        };
        let key = self.bloom_checkpoint_key();
        let bytes = Bytes::from(self.bloom.to_bytes());
        let metadata = CacheEntryMetadata::new(Some(BLOOM_CONTENT_TYPE.to_string()), bytes.len() as i64);
        if let Err(err) = provider.store(&key, bytes, metadata).await {
            self.emit(CacheEvent::error(
                key.to_string_key(),
                Some(provider.name().to_string()),
                format!("bloom checkpoint failed: {err}"),
            ));
        }
    }

    /// Restores the bloom filter from the reserved checkpoint key.
    /// Missing state is not an error — cloud tiers simply re-warm the
    /// filter from subsequent traffic.
    pub async fn load_bloom(&self) -> Result<(), CacheError> {
        let Some(provider) = self.first_local_durable_provider() else {
            return Ok(());
        };
        let key = self.bloom_checkpoint_key();
        match provider.fetch(&key).await {
            Ok(Some(result)) => {
                if let CachePayload::Buffered(bytes) = result.payload {
                    self.bloom.load_from_bytes(&bytes)?;
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                self.emit(CacheEvent::error(
                    key.to_string_key(),
                    Some(provider.name().to_string()),
                    format!("bloom load failed: {err}"),
                ));
                Ok(())
            }
        }
    }

    /// Slot-wise OR-merges a peer's bloom image into this cascade's
    /// filter, for cross-instance warm-up.
    pub fn merge_bloom_from_peer(&self, bytes: &[u8]) -> Result<(), CacheError> {
        self.bloom.merge_from_bytes(bytes)
    }

    pub fn bloom(&self) -> &RotatingBloomFilter {
        &self.bloom
    }

    /// Cancels and best-effort drains the upload queue. Call before
    /// dropping the cascade to avoid leaking detached store tasks.
    pub async fn shutdown(&self) {
        self.upload_queue.dispose().await;
    }
}

fn classify_hit(caps: &CacheProviderCapabilities) -> CacheStatus {
    if caps.requires_inline_execution {
        CacheStatus::MemoryHit
    } else if caps.is_local() {
        CacheStatus::DiskHit
    } else {
        CacheStatus::CloudHit
    }
}

/// The leader's logic for a miss: re-run the fetch pass once (double
/// check — another caller may have populated a tier between the miss and
/// the leader actually starting), then fall back to the factory.
async fn run_leader<F, Fut>(cascade: Arc<CacheCascade>, key: CacheKey, factory: F) -> LeaderOutcome
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Option<(Bytes, CacheEntryMetadata)>> + Send + 'static,
{
    let string_key = key.to_string_key();
    let (hit, _hit_index, _checked) = cascade.fetch_sequential(&key, &string_key).await;
    if let Some(hit) = hit {
        if let CachePayload::Buffered(data) = hit.payload {
            return LeaderOutcome::Found {
                data,
                metadata: hit.metadata,
            };
        }
    }

    match factory().await {
        Some((data, metadata)) => LeaderOutcome::Created { data, metadata },
        None => LeaderOutcome::FactoryReturnedNull,
    }
}
