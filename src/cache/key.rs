//! [`CacheKey`]: the two-digest identity of a cached entry.

use sha2::{Digest, Sha256};

/// Width, in bytes, of each digest carried by a [`CacheKey`].
pub const DIGEST_LEN: usize = 16;

/// A cache key with two fixed-width digests: `source_hash` (a pure
/// function of the source identifier alone) and `variant_hash` (a
/// function of `source ⊕ NUL ⊕ variant`).
///
/// Both digests are truncated SHA-256 — 16 bytes is plenty for a
/// collision-resistant cache key and keeps `to_storage_path` short.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source_hash: [u8; DIGEST_LEN],
    variant_hash: [u8; DIGEST_LEN],
}

impl std::fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheKey")
            .field("source_hash", &hex::encode(self.source_hash))
            .field("variant_hash", &hex::encode(self.variant_hash))
            .finish()
    }
}

fn digest16(data: &[u8]) -> [u8; DIGEST_LEN] {
    let full = Sha256::digest(data);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&full[..DIGEST_LEN]);
    out
}

impl CacheKey {
    /// Builds a key from a source identifier and a variant parameter
    /// string. `source_hash` depends only on `source`; `variant_hash`
    /// depends on both, separated by a NUL byte so `("ab", "c")` and
    /// `("a", "bc")` never collide on the variant side.
    pub fn from_strings(source: &str, variant: &str) -> Self {
        let source_hash = digest16(source.as_bytes());
        let mut variant_input = Vec::with_capacity(source.len() + 1 + variant.len());
        variant_input.extend_from_slice(source.as_bytes());
        variant_input.push(0);
        variant_input.extend_from_slice(variant.as_bytes());
        let variant_hash = digest16(&variant_input);
        Self {
            source_hash,
            variant_hash,
        }
    }

    /// Reconstructs a key from raw digests, e.g. when rehydrating from a
    /// storage path. Does not validate that `variant_hash` was actually
    /// derived from `source_hash`'s source string — that relationship is
    /// one-way by construction.
    pub fn from_digests(source_hash: [u8; DIGEST_LEN], variant_hash: [u8; DIGEST_LEN]) -> Self {
        Self {
            source_hash,
            variant_hash,
        }
    }

    pub fn source_hash(&self) -> [u8; DIGEST_LEN] {
        self.source_hash
    }

    pub fn variant_hash(&self) -> [u8; DIGEST_LEN] {
        self.variant_hash
    }

    /// Canonical lowercase-hex `"{source_hex}:{variant_hex}"` form, used
    /// as the dictionary / coalescing key throughout the cascade.
    pub fn to_string_key(&self) -> String {
        format!(
            "{}:{}",
            hex::encode(self.source_hash),
            hex::encode(self.variant_hash)
        )
    }

    /// `"{source_hex[0..4]}/{source_hex}/{variant_hex}"`, fanning a single
    /// source out across ~65K directories for filesystem-backed tiers.
    pub fn to_storage_path(&self) -> String {
        let source_hex = hex::encode(self.source_hash);
        let variant_hex = hex::encode(self.variant_hash);
        format!("{}/{}/{}", &source_hex[0..4], source_hex, variant_hex)
    }

    /// Lowercase hex of `source_hash` alone, used for purge-by-source.
    pub fn source_prefix(&self) -> String {
        hex::encode(self.source_hash)
    }

    /// Parses the `(source_prefix, variant_hex)` pair back out of a
    /// storage path produced by [`Self::to_storage_path`]. Returns `None`
    /// for malformed input rather than panicking — this is a round-trip
    /// helper, not a trusted-input parser.
    pub fn parse_storage_path(path: &str) -> Option<(String, String)> {
        let mut parts = path.split('/');
        let prefix = parts.next()?;
        let source_hex = parts.next()?;
        let variant_hex = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        if !source_hex.starts_with(prefix) || source_hex.len() != DIGEST_LEN * 2 {
            return None;
        }
        if variant_hex.len() != DIGEST_LEN * 2 {
            return None;
        }
        Some((source_hex.to_ascii_lowercase(), variant_hex.to_ascii_lowercase()))
    }
}
