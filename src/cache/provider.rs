//! [`CacheProvider`]: the narrow collaborator contract a storage tier
//! implements. Concrete tiers (memory, disk, cloud object stores) are out
//! of scope here.

use super::entry::{CacheEntryMetadata, CacheFetchResult, CacheProviderCapabilities, CacheStoreReason};
use super::error::ProviderError;
use super::key::CacheKey;
use async_trait::async_trait;
use bytes::Bytes;

/// A single cache tier. Every fallible method returns an explicit
/// `Result` rather than relying on the caller
/// to catch an exception: `Ok(None)` from `fetch` means "checked, not
/// present"; `Err` means "the check itself failed", which the cascade
/// still treats as a miss but also reports as a
/// [`crate::cache::events::CacheEventKind::Error`] event.
///
/// `store` must not mutate the passed buffer.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> &CacheProviderCapabilities;

    async fn fetch(&self, key: &CacheKey) -> Result<Option<CacheFetchResult>, ProviderError>;

    async fn store(
        &self,
        key: &CacheKey,
        data: Bytes,
        metadata: CacheEntryMetadata,
    ) -> Result<(), ProviderError>;

    /// Whether this provider wants a copy of an entry it did not itself
    /// produce or serve. Infallible by design — a subscription decision
    /// should never need to report an error; a provider that cannot
    /// accept writes right now simply returns `false`.
    async fn wants_to_store(&self, key: &CacheKey, size_bytes: i64, reason: CacheStoreReason) -> bool;

    async fn invalidate(&self, key: &CacheKey) -> Result<bool, ProviderError>;

    async fn purge_by_source(&self, source_hash: [u8; 16]) -> Result<u32, ProviderError>;

    async fn health_check(&self) -> Result<bool, ProviderError>;
}
