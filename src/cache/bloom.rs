//! [`RotatingBloomFilter`]: the remote-tier skip gate.
//!
//! Sizes `m`/`k` from a target capacity and error rate and serializes to
//! a self-identifying byte image, using an FNV-1a plus Knuth-multiplicative
//! double-hash construction, with slot rotation layered on top to age
//! entries out over time.

use super::error::CacheError;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

const MAX_BITS: u64 = 2_000_000_000;
const MAGIC: &[u8; 4] = b"RBF1";
const ENCODING_VERSION: u8 = 1;

fn fnv1a_32(data: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in data {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// A second, independent 32-bit hash built from Knuth's multiplicative
/// hashing constant (`2654435761`, the nearest prime to 2^32 times the
/// golden ratio), used for double hashing. The bitwise
/// prefix differs from [`fnv1a_32`]'s seed so the two hashes are not mere
/// recombinations of one pass.
fn knuth_multiplicative_32(data: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5 ^ 0x9e37_79b9;
    for &b in data {
        hash ^= b as u32;
        hash = hash.wrapping_mul(2_654_435_761);
    }
    if hash == 0 { 1 } else { hash }
}

fn double_hash(data: &[u8]) -> (u64, u64) {
    let h1 = fnv1a_32(data) as u64;
    let mut h2 = knuth_multiplicative_32(data) as u64;
    if h2 == 0 {
        h2 = 1;
    }
    (h1, h2)
}

struct Slot {
    words: Vec<AtomicU32>,
}

impl Slot {
    fn new(word_count: usize) -> Self {
        Self {
            words: (0..word_count).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    fn clear(&self) {
        for w in &self.words {
            w.store(0, Ordering::Relaxed);
        }
    }

    fn set_bit(&self, index: u64) {
        let word_idx = (index / 32) as usize;
        let bit = 1u32 << (index % 32);
        self.words[word_idx].fetch_or(bit, Ordering::Relaxed);
    }

    fn test_bit(&self, index: u64) -> bool {
        let word_idx = (index / 32) as usize;
        let bit = 1u32 << (index % 32);
        (self.words[word_idx].load(Ordering::Relaxed) & bit) != 0
    }
}

/// A fixed array of `slot_count` bit-arrays with an aging `current_slot`
/// cursor. Inserts touch only the current slot; lookups OR across all
/// slots; rotation clears the oldest slot and advances into it.
pub struct RotatingBloomFilter {
    bits_per_slot: u64,
    words_per_slot: usize,
    hash_count: u32,
    slot_count: usize,
    current_slot: AtomicUsize,
    slots: RwLock<Vec<Slot>>,
}

impl RotatingBloomFilter {
    /// `m = ceil(-n*ln(p) / ln(2)^2)`, capped at 2e9 bits.
    fn optimal_bits(estimated_items: u64, false_positive_rate: f64) -> u64 {
        let n = estimated_items.max(1) as f64;
        let p = false_positive_rate.clamp(f64::MIN_POSITIVE, 0.5);
        let m = (-(n * p.ln()) / std::f64::consts::LN_2.powi(2)).ceil();
        (m as u64).max(1).min(MAX_BITS)
    }

    /// `k = max(1, round(m/n * ln(2)))`.
    fn optimal_hash_count(estimated_items: u64, bits: u64) -> u32 {
        let n = estimated_items.max(1) as f64;
        let k = ((bits as f64 / n) * std::f64::consts::LN_2).round();
        (k as i64).max(1) as u32
    }

    pub fn new(estimated_items: u64, false_positive_rate: f64, slot_count: usize) -> Self {
        let bits = Self::optimal_bits(estimated_items, false_positive_rate);
        let hash_count = Self::optimal_hash_count(estimated_items, bits);
        let words_per_slot = bits.div_ceil(32) as usize;
        let slot_count = slot_count.max(1);
        let slots = (0..slot_count).map(|_| Slot::new(words_per_slot)).collect();
        Self {
            bits_per_slot: (words_per_slot as u64) * 32,
            words_per_slot,
            hash_count,
            slot_count,
            current_slot: AtomicUsize::new(0),
            slots: RwLock::new(slots),
        }
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    pub fn bits_per_slot(&self) -> u64 {
        self.bits_per_slot
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Sets the `k` derived bit indices for `key` in the current slot.
    /// Lock-free: only an atomic-OR per word, no write lock taken.
    pub fn insert(&self, key: &str) {
        let (h1, h2) = double_hash(key.as_bytes());
        let slots = self.slots.read();
        let current = self.current_slot.load(Ordering::Acquire);
        let slot = &slots[current];
        for i in 0..self.hash_count as u64 {
            let index = h1.wrapping_add(i.wrapping_mul(h2)) % self.bits_per_slot;
            slot.set_bit(index);
        }
    }

    /// True iff any slot has all `k` bits set for `key`.
    pub fn probably_contains(&self, key: &str) -> bool {
        let (h1, h2) = double_hash(key.as_bytes());
        let indices: Vec<u64> = (0..self.hash_count as u64)
            .map(|i| h1.wrapping_add(i.wrapping_mul(h2)) % self.bits_per_slot)
            .collect();
        let slots = self.slots.read();
        slots
            .iter()
            .any(|slot| indices.iter().all(|&idx| slot.test_bit(idx)))
    }

    /// Advances `current_slot` and clears the slot advanced into — the
    /// oldest generation, about to become the new write target.
    pub fn rotate(&self) {
        let slots = self.slots.write();
        let next = (self.current_slot.load(Ordering::Acquire) + 1) % self.slot_count;
        slots[next].clear();
        self.current_slot.store(next, Ordering::Release);
    }

    pub fn clear(&self) {
        let slots = self.slots.write();
        for slot in slots.iter() {
            slot.clear();
        }
        self.current_slot.store(0, Ordering::Release);
    }

    /// Envelope: magic, version, slot_count, bits_per_slot, hash_count,
    /// current_slot, then each slot's raw little-endian words, trailed by
    /// a CRC-32 of everything before it. Unrecognized or corrupt payloads
    /// are rejected by [`Self::load_from_bytes`]/[`Self::merge_from_bytes`]
    /// rather than misparsed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let slots = self.slots.read();
        let mut buf = Vec::with_capacity(16 + self.words_per_slot * 4 * self.slot_count);
        buf.extend_from_slice(MAGIC);
        buf.push(ENCODING_VERSION);
        buf.extend_from_slice(&(self.slot_count as u32).to_le_bytes());
        buf.extend_from_slice(&(self.bits_per_slot as u32).to_le_bytes());
        buf.extend_from_slice(&self.hash_count.to_le_bytes());
        buf.extend_from_slice(&(self.current_slot.load(Ordering::Acquire) as u32).to_le_bytes());
        for slot in slots.iter() {
            for word in &slot.words {
                buf.extend_from_slice(&word.load(Ordering::Relaxed).to_le_bytes());
            }
        }
        let checksum = crc32(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }

    fn parse_header(bytes: &[u8]) -> Result<(usize, u64, u32, usize, usize), CacheError> {
        if bytes.len() < 21 || &bytes[0..4] != MAGIC {
            return Err(CacheError::BloomPayloadInvalid);
        }
        if bytes[4] != ENCODING_VERSION {
            return Err(CacheError::BloomPayloadInvalid);
        }
        let checksum_at = bytes.len() - 4;
        let expected = u32::from_le_bytes(bytes[checksum_at..].try_into().unwrap());
        if crc32(&bytes[..checksum_at]) != expected {
            return Err(CacheError::BloomPayloadInvalid);
        }
        let slot_count = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
        let bits_per_slot = u32::from_le_bytes(bytes[9..13].try_into().unwrap()) as u64;
        let hash_count = u32::from_le_bytes(bytes[13..17].try_into().unwrap());
        let current_slot = u32::from_le_bytes(bytes[17..21].try_into().unwrap()) as usize;
        let words_per_slot = (bits_per_slot / 32) as usize;
        let expected_len = 21 + words_per_slot * 4 * slot_count + 4;
        if bytes.len() != expected_len || current_slot >= slot_count.max(1) {
            return Err(CacheError::BloomPayloadInvalid);
        }
        Ok((slot_count, bits_per_slot, hash_count, current_slot, words_per_slot))
    }

    /// Replaces this filter's state with the payload's, or returns an
    /// error (never panics) on an unrecognized/corrupt payload; the
    /// caller is expected to leave the filter empty in that case.
    pub fn load_from_bytes(&self, bytes: &[u8]) -> Result<(), CacheError> {
        let (slot_count, bits_per_slot, _hash_count, current_slot, words_per_slot) =
            Self::parse_header(bytes)?;
        if slot_count != self.slot_count || bits_per_slot != self.bits_per_slot {
            return Err(CacheError::BloomDimensionMismatch(
                "slot_count/bits_per_slot differ from this filter's configuration".into(),
            ));
        }
        let mut slots = self.slots.write();
        let mut offset = 21;
        for slot in slots.iter_mut() {
            for word in slot.words.iter_mut() {
                let value = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
                *word = AtomicU32::new(value);
                offset += 4;
            }
        }
        let _ = words_per_slot;
        self.current_slot.store(current_slot, Ordering::Release);
        Ok(())
    }

    /// Slot-wise bitwise OR of a peer's image into this filter. Requires
    /// matching dimensions (same sizing parameters); a payload from a
    /// differently-configured peer is rejected rather than silently
    /// truncated or padded.
    pub fn merge_from_bytes(&self, bytes: &[u8]) -> Result<(), CacheError> {
        let (slot_count, bits_per_slot, _hash_count, _current_slot, _words_per_slot) =
            Self::parse_header(bytes)?;
        if slot_count != self.slot_count || bits_per_slot != self.bits_per_slot {
            return Err(CacheError::BloomDimensionMismatch(
                "slot_count/bits_per_slot differ from this filter's configuration".into(),
            ));
        }
        let slots = self.slots.read();
        let mut offset = 21;
        for slot in slots.iter() {
            for word in &slot.words {
                let value = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
                word.fetch_or(value, Ordering::Relaxed);
                offset += 4;
            }
        }
        Ok(())
    }
}

/// Small CRC-32 (IEEE) implementation via the `crc` crate's table-based
/// algorithm, used only to detect a corrupt or foreign bloom payload.
fn crc32(data: &[u8]) -> u32 {
    const CRC: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
    CRC.checksum(data)
}
