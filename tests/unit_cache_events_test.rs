// tests/unit_cache_events_test.rs

use async_trait::async_trait;
use bytes::Bytes;
use cascade_route::cache::error::ProviderError;
use cascade_route::cache::{
    CacheCascade, CacheEntryMetadata, CacheEventKind, CacheFetchResult, CacheKey, CacheProvider,
    CacheProviderCapabilities, CacheStoreReason,
};
use cascade_route::config::CascadeConfig;

struct AlwaysMissProvider {
    caps: CacheProviderCapabilities,
}

#[async_trait]
impl CacheProvider for AlwaysMissProvider {
    fn name(&self) -> &str {
        "miss"
    }

    fn capabilities(&self) -> &CacheProviderCapabilities {
        &self.caps
    }

    async fn fetch(&self, _key: &CacheKey) -> Result<Option<CacheFetchResult>, ProviderError> {
        Ok(None)
    }

    async fn store(&self, _key: &CacheKey, _data: Bytes, _metadata: CacheEntryMetadata) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn wants_to_store(&self, _key: &CacheKey, _size_bytes: i64, _reason: CacheStoreReason) -> bool {
        false
    }

    async fn invalidate(&self, _key: &CacheKey) -> Result<bool, ProviderError> {
        Ok(false)
    }

    async fn purge_by_source(&self, _source_hash: [u8; 16]) -> Result<u32, ProviderError> {
        Ok(0)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

#[tokio::test]
async fn a_miss_followed_by_creation_emits_miss_then_store_events() {
    let provider = std::sync::Arc::new(AlwaysMissProvider { caps: CacheProviderCapabilities::local() });
    let cascade = CacheCascade::new(vec![provider], CascadeConfig::default(), None);
    let mut events = cascade.subscribe_events();

    let key = CacheKey::from_strings("s", "v");
    let _ = cascade
        .get_or_create(&key, || async {
            Some((Bytes::from_static(b"data"), CacheEntryMetadata::unknown_length(None)))
        })
        .await;

    let first = events.recv().await.unwrap();
    assert_eq!(first.kind, CacheEventKind::Miss);
}

#[tokio::test]
async fn observer_callback_receives_the_same_events_as_the_broadcast_channel() {
    let provider = std::sync::Arc::new(AlwaysMissProvider { caps: CacheProviderCapabilities::local() });
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_for_observer = seen.clone();
    let observer: cascade_route::cache::EventObserver = std::sync::Arc::new(move |event| {
        seen_for_observer.lock().unwrap().push(event.kind);
    });

    let cascade = CacheCascade::new(vec![provider], CascadeConfig::default(), Some(observer));
    let key = CacheKey::from_strings("s", "v");
    let _ = cascade.get_or_create(&key, || async { None }).await;

    let recorded = seen.lock().unwrap().clone();
    assert!(recorded.contains(&CacheEventKind::Miss));
}
