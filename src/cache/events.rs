//! The cache event stream: every significant state change the
//! cascade goes through, broadcast to any number of observers. A bounded
//! `tokio::sync::broadcast` channel plus a direct callback for the common
//! single-observer case.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    Hit,
    Miss,
    Store,
    StoreDropped,
    Error,
}

/// One occurrence in the cascade's life. Observers must not block or
/// panic in a way that escapes [`crate::cache::cascade::CacheCascade`] —
/// the cascade wraps every dispatch in `catch_unwind` so a faulty
/// observer cannot bring down the request path.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub kind: CacheEventKind,
    pub key: String,
    pub provider_name: Option<String>,
    pub latency: Option<Duration>,
    pub detail: Option<String>,
}

impl CacheEvent {
    pub fn hit(key: impl Into<String>, provider_name: impl Into<String>, latency: Duration) -> Self {
        Self {
            kind: CacheEventKind::Hit,
            key: key.into(),
            provider_name: Some(provider_name.into()),
            latency: Some(latency),
            detail: None,
        }
    }

    pub fn miss(key: impl Into<String>) -> Self {
        Self {
            kind: CacheEventKind::Miss,
            key: key.into(),
            provider_name: None,
            latency: None,
            detail: None,
        }
    }

    pub fn store(key: impl Into<String>, provider_name: impl Into<String>) -> Self {
        Self {
            kind: CacheEventKind::Store,
            key: key.into(),
            provider_name: Some(provider_name.into()),
            latency: None,
            detail: None,
        }
    }

    pub fn store_dropped(key: impl Into<String>, provider_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: CacheEventKind::StoreDropped,
            key: key.into(),
            provider_name: Some(provider_name.into()),
            latency: None,
            detail: Some(detail.into()),
        }
    }

    pub fn error(key: impl Into<String>, provider_name: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: CacheEventKind::Error,
            key: key.into(),
            provider_name,
            latency: None,
            detail: Some(detail.into()),
        }
    }
}
