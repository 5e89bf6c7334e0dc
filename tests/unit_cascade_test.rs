// tests/unit_cascade_test.rs

use async_trait::async_trait;
use bytes::Bytes;
use cascade_route::cache::{
    CacheCascade, CacheEntryMetadata, CacheEventKind, CacheFetchResult, CacheKey, CacheProvider,
    CacheProviderCapabilities, CacheStatus, CacheStoreReason,
};
use cascade_route::cache::error::ProviderError;
use cascade_route::config::CascadeConfig;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct MockProvider {
    name: &'static str,
    caps: CacheProviderCapabilities,
    fetch_result: Mutex<Option<Bytes>>,
    wants_to_store: bool,
    store_calls: Arc<AtomicUsize>,
}

impl MockProvider {
    fn new(name: &'static str, caps: CacheProviderCapabilities, fetch_result: Option<Bytes>, wants_to_store: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            caps,
            fetch_result: Mutex::new(fetch_result),
            wants_to_store,
            store_calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn store_count(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn capabilities(&self) -> &CacheProviderCapabilities {
        &self.caps
    }

    async fn fetch(&self, _key: &CacheKey) -> Result<Option<CacheFetchResult>, ProviderError> {
        let guard = self.fetch_result.lock();
        Ok(guard
            .clone()
            .map(|data| CacheFetchResult::buffered(data, CacheEntryMetadata::unknown_length(None))))
    }

    async fn store(&self, _key: &CacheKey, data: Bytes, _metadata: CacheEntryMetadata) -> Result<(), ProviderError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        *self.fetch_result.lock() = Some(data);
        Ok(())
    }

    async fn wants_to_store(&self, _key: &CacheKey, _size_bytes: i64, _reason: CacheStoreReason) -> bool {
        self.wants_to_store
    }

    async fn invalidate(&self, _key: &CacheKey) -> Result<bool, ProviderError> {
        Ok(true)
    }

    async fn purge_by_source(&self, _source_hash: [u8; 16]) -> Result<u32, ProviderError> {
        Ok(0)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

/// Scenario 1: cloud hit replicates to mem (inline store) and disk
/// (enqueued), and the bloom filter gains the bit for the enqueued tier.
#[tokio::test]
async fn cloud_hit_replicates_to_mem_and_disk() {
    let mem = MockProvider::new("mem", CacheProviderCapabilities::inline(), None, true);
    let disk = MockProvider::new("disk", CacheProviderCapabilities::local(), None, true);
    let cloud = MockProvider::new(
        "cloud",
        CacheProviderCapabilities::remote("s3:us-east-1:bkt"),
        Some(Bytes::from_static(b"payload")),
        true,
    );

    let cascade = CacheCascade::new(
        vec![mem.clone(), disk.clone(), cloud.clone()],
        CascadeConfig::default(),
        None,
    );

    let key = CacheKey::from_strings("source", "variant");
    let result = cascade.get_or_create(&key, || async { None }).await;

    assert_eq!(result.status, CacheStatus::CloudHit);
    assert_eq!(result.data, Some(Bytes::from_static(b"payload")));

    // give the spawned inline store and the enqueued disk store a chance
    // to run before asserting on them.
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(mem.store_count(), 1);
    assert_eq!(disk.store_count(), 1);
}

/// Scenario 2: ten concurrent callers against the same key and an
/// always-empty provider set invoke the factory exactly once and all
/// observe the same bytes.
#[tokio::test]
async fn coalesced_factory_runs_once_for_concurrent_callers() {
    let empty = MockProvider::new("empty", CacheProviderCapabilities::local(), None, false);
    let mut config = CascadeConfig::default();
    config.enable_request_coalescing = true;
    config.coalescing_timeout_ms = Some(1_000);

    let cascade = CacheCascade::new(vec![empty], config, None);
    let key = CacheKey::from_strings("source", "variant");

    let factory_calls = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..10 {
        let cascade = Arc::clone(&cascade);
        let key = key;
        let factory_calls = Arc::clone(&factory_calls);
        handles.push(tokio::spawn(async move {
            cascade
                .get_or_create(&key, move || {
                    let factory_calls = Arc::clone(&factory_calls);
                    async move {
                        factory_calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Some((Bytes::from_static(b"created"), CacheEntryMetadata::unknown_length(None)))
                    }
                })
                .await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
    for result in &results {
        assert_eq!(result.data, Some(Bytes::from_static(b"created")));
    }
}

/// Scenario 2 continued: each of the 10 coalesced callers independently
/// resumes after the shared factory result and calls `distribute`, so a
/// non-inline accepting provider sees one store event per caller even
/// though the upload queue itself only performs the upload once (the
/// later 9 calls dedup against the first's in-flight entry).
#[tokio::test]
async fn coalesced_callers_each_emit_a_store_event_for_an_accepting_provider() {
    let disk = MockProvider::new("disk", CacheProviderCapabilities::local(), None, true);
    let mut config = CascadeConfig::default();
    config.enable_request_coalescing = true;
    config.coalescing_timeout_ms = Some(1_000);

    let cascade = CacheCascade::new(vec![disk.clone()], config, None);
    let key = CacheKey::from_strings("source", "variant2");

    let mut events = cascade.subscribe_events();
    let store_events = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&store_events);
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event.kind == CacheEventKind::Store {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    let mut handles = Vec::new();
    for _ in 0..10 {
        let cascade = Arc::clone(&cascade);
        handles.push(tokio::spawn(async move {
            cascade
                .get_or_create(&key, || async {
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Some((Bytes::from_static(b"created"), CacheEntryMetadata::unknown_length(None)))
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(store_events.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn factory_returning_none_surfaces_as_error() {
    let empty = MockProvider::new("empty", CacheProviderCapabilities::local(), None, false);
    let cascade = CacheCascade::new(vec![empty], CascadeConfig::default(), None);
    let key = CacheKey::from_strings("source", "variant");

    let result = cascade.get_or_create(&key, || async { None }).await;
    assert_eq!(result.status, CacheStatus::Error);
    assert_eq!(result.error_detail.as_deref(), Some("Factory returned null"));
}

#[tokio::test]
async fn bloom_checkpoint_round_trips_through_a_local_provider() {
    let disk = MockProvider::new("disk", CacheProviderCapabilities::local(), None, true);
    let cascade = CacheCascade::new(vec![disk], CascadeConfig::default(), None);

    cascade.bloom().insert("k:remote");
    cascade.checkpoint_bloom().await;
    cascade.bloom().clear();
    assert!(!cascade.bloom().probably_contains("k:remote"));

    cascade.load_bloom().await.unwrap();
    assert!(cascade.bloom().probably_contains("k:remote"));
}
