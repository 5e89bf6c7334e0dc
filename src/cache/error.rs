//! Error taxonomy for the cache cascade: one `thiserror`-derived variant
//! per failure kind, with `From` impls where a lower layer's error
//! composes cleanly.

use thiserror::Error;

/// Failures a [`crate::cache::provider::CacheProvider`] can report. A
/// provider returns `Ok(None)` for "not present" and `Err(ProviderError)`
/// for "failed to check", so "fetch failed counts as a miss" is a total
/// function at the cascade boundary rather than a catch-all.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),
    #[error("store failed: {0}")]
    Store(#[source] anyhow::Error),
    #[error("invalidate failed: {0}")]
    Invalidate(#[source] anyhow::Error),
    #[error("purge failed: {0}")]
    Purge(#[source] anyhow::Error),
    #[error("health check failed: {0}")]
    HealthCheck(#[source] anyhow::Error),
}

/// Cascade-level errors. Most provider-boundary failures never reach the
/// caller as an `Err` — they are contained and surfaced as a
/// [`crate::cache::entry::CacheStatus::Error`] result or a
/// [`crate::cache::events::CacheEventKind::Error`] event. This
/// enum covers the handful of cases the cascade itself returns as `Err`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("bloom checkpoint failed: {0}")]
    BloomCheckpoint(String),
    #[error("bloom payload unrecognized or corrupt")]
    BloomPayloadInvalid,
    #[error("bloom merge dimensions do not match: {0}")]
    BloomDimensionMismatch(String),
    #[error("upload queue has been disposed")]
    Disposed,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
