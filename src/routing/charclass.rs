//! Character classes (`[a-z0-9_]`, `[^…]`, the `\w` shorthand) and their
//! interning cache.
//!
//! Bounded the same way other process-wide caches are: must not leak
//! memory under a "many distinct classes" workload, so it is a
//! `parking_lot::Mutex<lru::LruCache<..>>`. Keyed by a 64-bit hash with a
//! string-equality fallback bucket to handle hash collisions.

use super::error::{RoutingError, RoutingParseResult};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A compiled character class over the ASCII byte range. Classes over
/// non-ASCII bytes are rejected at parse time — matcher input is treated
/// as percent-encoded path/query text, which is ASCII by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    allowed: [bool; 128],
}

impl CharClass {
    pub fn contains(&self, byte: u8) -> bool {
        (byte as usize) < 128 && self.allowed[byte as usize]
    }

    pub const WORD: &'static str = r"\w";

    fn word_class() -> Self {
        let mut allowed = [false; 128];
        for b in b'a'..=b'z' {
            allowed[b as usize] = true;
        }
        for b in b'A'..=b'Z' {
            allowed[b as usize] = true;
        }
        for b in b'0'..=b'9' {
            allowed[b as usize] = true;
        }
        allowed[b'_' as usize] = true;
        Self { allowed }
    }

    /// Parses the body between `[` and `]` (exclusive of the brackets).
    /// Supports `^` negation, `a-z` ranges (non-empty, low→high, dashes
    /// not adjacent), `\`-escaped specials, and the `\w` shorthand.
    pub fn parse(body: &str) -> RoutingParseResult<Self> {
        if body == Self::WORD {
            return Ok(Self::word_class());
        }
        let bytes = body.as_bytes();
        let mut idx = 0;
        let negate = bytes.first() == Some(&b'^');
        if negate {
            idx += 1;
        }
        let mut allowed = [false; 128];
        while idx < bytes.len() {
            let c = bytes[idx];
            if c == b'\\' {
                idx += 1;
                if idx >= bytes.len() {
                    return Err(RoutingError::InvalidCharClass(
                        "dangling escape".to_string(),
                    ));
                }
                let escaped = bytes[idx];
                allowed[escaped as usize] = true;
                idx += 1;
                continue;
            }
            if idx + 2 < bytes.len() && bytes[idx + 1] == b'-' && bytes[idx + 2] != b']' {
                let low = c;
                let high = bytes[idx + 2];
                if high < low {
                    return Err(RoutingError::InvalidCharClass(format!(
                        "range {}-{} is empty or inverted",
                        low as char, high as char
                    )));
                }
                for b in low..=high {
                    if (b as usize) < 128 {
                        allowed[b as usize] = true;
                    }
                }
                idx += 3;
                continue;
            }
            allowed[c as usize] = true;
            idx += 1;
        }
        if negate {
            for b in allowed.iter_mut() {
                *b = !*b;
            }
        }
        Ok(Self { allowed })
    }
}

/// Bounded, hash-keyed interning cache with a string-equality fallback
/// bucket per hash to resolve collisions without ever returning the wrong
/// class for a given source string.
pub struct CharClassCache {
    inner: Mutex<LruCache<u64, Vec<(String, Arc<CharClass>)>>>,
}

impl CharClassCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
        }
    }

    fn hash_of(pattern: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        pattern.hash(&mut hasher);
        hasher.finish()
    }

    /// Returns the interned class for `pattern`, compiling and inserting
    /// it on first use.
    pub fn intern(&self, pattern: &str) -> RoutingParseResult<Arc<CharClass>> {
        let hash = Self::hash_of(pattern);
        {
            let mut guard = self.inner.lock();
            if let Some(bucket) = guard.get_mut(&hash) {
                if let Some((_, class)) = bucket.iter().find(|(p, _)| p == pattern) {
                    return Ok(Arc::clone(class));
                }
            }
        }
        let compiled = Arc::new(CharClass::parse(pattern)?);
        let mut guard = self.inner.lock();
        match guard.get_mut(&hash) {
            Some(bucket) => bucket.push((pattern.to_string(), Arc::clone(&compiled))),
            None => {
                guard.put(hash, vec![(pattern.to_string(), Arc::clone(&compiled))]);
            }
        }
        Ok(compiled)
    }
}

impl Default for CharClassCache {
    fn default() -> Self {
        Self::new(1024)
    }
}
