//! [`RequestCoalescer`]: single-flight binding of concurrent callers to
//! one in-flight computation per key.
//!
//! An atomic insert-or-get against a `DashMap` entry decides leadership,
//! and a `tokio::sync::OnceCell` gives followers an async-await-friendly
//! way to block on a leader's result without a separate notify/wake
//! dance.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Binds concurrent callers under the same key to a single leader
/// computation. The first caller for a key is the leader and runs the
/// supplied future; later callers for the same key, while it is still
/// in flight, await the leader's result bounded by `timeout`.
pub struct RequestCoalescer<T: Clone + Send + Sync + 'static> {
    inflight: DashMap<String, Arc<OnceCell<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> RequestCoalescer<T> {
    pub fn new() -> Self {
        Self {
            inflight: DashMap::new(),
        }
    }

    /// Runs `leader_fn` exactly once per key among concurrently-coalesced
    /// callers. Returns `(true, Some(result))` for the leader and for
    /// followers that observe the leader's result within `timeout`;
    /// returns `(false, None)` for a follower that times out (the leader
    /// keeps running regardless — a follower's timeout never cancels it).
    pub async fn try_execute<F, Fut>(&self, key: &str, timeout: Duration, leader_fn: F) -> (bool, Option<T>)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let (cell, is_leader) = match self.inflight.entry(key.to_string()) {
            Entry::Occupied(e) => (e.get().clone(), false),
            Entry::Vacant(v) => {
                let cell = Arc::new(OnceCell::new());
                v.insert(cell.clone());
                (cell, true)
            }
        };

        if is_leader {
            let result = leader_fn().await;
            // `set` cannot fail here: only the leader holds a fresh cell.
            let _ = cell.set(result.clone());
            self.inflight.remove(key);
            (true, Some(result))
        } else {
            match tokio::time::timeout(timeout, cell.wait()).await {
                Ok(value) => (true, Some(value.clone())),
                Err(_) => (false, None),
            }
        }
    }

    /// Number of keys with an in-flight leader. Exposed for tests and
    /// observability, not part of the coalescing contract.
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }
}
