//! Value types that flow through the cascade: metadata, fetch results, and
//! the tagged-union [`CacheResult`] every `get_or_create` call returns.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::AsyncRead;

/// A boxed, owned, lazily-read byte stream. The caller takes ownership and
/// is responsible for releasing it.
pub type BoxedStream = Pin<Box<dyn AsyncRead + Send>>;

/// Content metadata carried alongside cached bytes.
#[derive(Clone)]
pub struct CacheEntryMetadata {
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Content length in bytes, or `-1` if unknown.
    pub content_length: i64,
}

impl fmt::Debug for CacheEntryMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntryMetadata")
            .field("content_type", &self.content_type)
            .field("created_at", &self.created_at)
            .field("content_length", &self.content_length)
            .finish()
    }
}

impl CacheEntryMetadata {
    pub fn new(content_type: Option<String>, content_length: i64) -> Self {
        Self {
            content_type,
            created_at: Utc::now(),
            content_length,
        }
    }

    pub fn unknown_length(content_type: Option<String>) -> Self {
        Self::new(content_type, -1)
    }
}

/// Either buffered bytes or a lazy readable stream, with metadata.
pub enum CachePayload {
    Buffered(Bytes),
    Stream(BoxedStream),
}

impl fmt::Debug for CachePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePayload::Buffered(b) => write!(f, "CachePayload::Buffered({} bytes)", b.len()),
            CachePayload::Stream(_) => write!(f, "CachePayload::Stream(..)"),
        }
    }
}

/// What a [`crate::cache::provider::CacheProvider::fetch`] call returns on
/// a hit.
#[derive(Debug)]
pub struct CacheFetchResult {
    pub payload: CachePayload,
    pub metadata: CacheEntryMetadata,
}

impl CacheFetchResult {
    pub fn buffered(data: Bytes, metadata: CacheEntryMetadata) -> Self {
        Self {
            payload: CachePayload::Buffered(data),
            metadata,
        }
    }

    pub fn streamed(stream: BoxedStream, metadata: CacheEntryMetadata) -> Self {
        Self {
            payload: CachePayload::Stream(stream),
            metadata,
        }
    }

    /// Content-length resolution order: buffer length, then metadata, then
    /// a caller-supplied seekable-stream length, else `-1`.
    pub fn content_length(&self, seekable_len: Option<u64>) -> i64 {
        match &self.payload {
            CachePayload::Buffered(data) => data.len() as i64,
            CachePayload::Stream(_) => {
                if self.metadata.content_length >= 0 {
                    self.metadata.content_length
                } else if let Some(len) = seekable_len {
                    len as i64
                } else {
                    -1
                }
            }
        }
    }
}

/// Which tier satisfied a `get_or_create` call, or why none did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    MemoryHit,
    DiskHit,
    CloudHit,
    QueueHit,
    Created,
    Timeout,
    Error,
}

/// The tagged union every `get_or_create` call resolves to. At most one
/// of `data`/`stream` is set, matching [`CachePayload`]'s shape but kept
/// flat here since this is the caller-facing result rather than an
/// internal provider value.
#[derive(Debug)]
pub struct CacheResult {
    pub status: CacheStatus,
    pub data: Option<Bytes>,
    pub stream: Option<BoxedStream>,
    pub content_type: Option<String>,
    pub provider_name: Option<String>,
    pub latency: Option<Duration>,
    pub error_detail: Option<String>,
}

impl CacheResult {
    pub fn hit(
        status: CacheStatus,
        payload: CachePayload,
        content_type: Option<String>,
        provider_name: impl Into<String>,
        latency: Duration,
    ) -> Self {
        let (data, stream) = match payload {
            CachePayload::Buffered(b) => (Some(b), None),
            CachePayload::Stream(s) => (None, Some(s)),
        };
        Self {
            status,
            data,
            stream,
            content_type,
            provider_name: Some(provider_name.into()),
            latency: Some(latency),
            error_detail: None,
        }
    }

    pub fn created(data: Bytes, content_type: Option<String>, latency: Duration) -> Self {
        Self {
            status: CacheStatus::Created,
            data: Some(data),
            stream: None,
            content_type,
            provider_name: None,
            latency: Some(latency),
            error_detail: None,
        }
    }

    pub fn timeout() -> Self {
        Self {
            status: CacheStatus::Timeout,
            data: None,
            stream: None,
            content_type: None,
            provider_name: None,
            latency: None,
            error_detail: None,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: CacheStatus::Error,
            data: None,
            stream: None,
            content_type: None,
            provider_name: None,
            latency: None,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(
            self.status,
            CacheStatus::MemoryHit
                | CacheStatus::DiskHit
                | CacheStatus::CloudHit
                | CacheStatus::QueueHit
                | CacheStatus::Created
        )
    }
}

/// A provider's declared capabilities.
#[derive(Debug, Clone)]
pub struct CacheProviderCapabilities {
    /// Must run synchronously on the caller's path — the in-process
    /// memory tier.
    pub requires_inline_execution: bool,
    /// `"local"`, or an opaque zone identifier such as `"s3:us-east-1:bkt"`.
    pub latency_zone: String,
}

impl CacheProviderCapabilities {
    pub fn local() -> Self {
        Self {
            requires_inline_execution: false,
            latency_zone: "local".to_string(),
        }
    }

    pub fn inline() -> Self {
        Self {
            requires_inline_execution: true,
            latency_zone: "local".to_string(),
        }
    }

    pub fn remote(zone: impl Into<String>) -> Self {
        Self {
            requires_inline_execution: false,
            latency_zone: zone.into(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.latency_zone == "local" || self.requires_inline_execution
    }
}

/// Why the cascade is asking a provider whether it wants to store an
/// entry it did not itself produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStoreReason {
    /// The entry was produced by the factory; no tier had it.
    FreshlyCreated,
    /// This provider was queried directly, or ruled out by the bloom
    /// filter, during the fetch pass.
    Missed,
    /// A faster tier hit before this provider was consulted, so its
    /// state is genuinely unknown.
    NotQueried,
}
