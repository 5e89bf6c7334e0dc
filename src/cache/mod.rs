//! Multi-tier cache cascade: bloom-gated remote probing, request
//! coalescing, and a byte-bounded write-behind queue over an arbitrary
//! stack of [`CacheProvider`] tiers.

pub mod bloom;
pub mod cascade;
pub mod coalescer;
pub mod entry;
pub mod error;
pub mod events;
pub mod key;
pub mod provider;
pub mod upload_queue;

pub use bloom::RotatingBloomFilter;
pub use cascade::{CacheCascade, EventObserver};
pub use coalescer::RequestCoalescer;
pub use entry::{
    BoxedStream, CacheEntryMetadata, CacheFetchResult, CachePayload, CacheProviderCapabilities,
    CacheResult, CacheStatus, CacheStoreReason,
};
pub use error::{CacheError, ProviderError};
pub use events::{CacheEvent, CacheEventKind};
pub use key::CacheKey;
pub use provider::CacheProvider;
pub use upload_queue::{AsyncUploadQueue, EnqueueOutcome};
