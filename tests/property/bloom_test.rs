// tests/property/bloom_test.rs

//! Property-based tests for `RotatingBloomFilter`: no false negatives, and
//! a checkpoint/restore round trip preserves membership.

use cascade_route::cache::RotatingBloomFilter;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig { cases: 200, ..ProptestConfig::default() })]

    #[test]
    fn insert_then_probe_never_false_negatives(keys in prop::collection::vec("[a-zA-Z0-9/:_-]{1,64}", 1..=200)) {
        let filter = RotatingBloomFilter::new(1_000, 0.01, 4);
        for key in &keys {
            filter.insert(key);
        }
        for key in &keys {
            prop_assert!(filter.probably_contains(key));
        }
    }

    #[test]
    fn to_bytes_and_load_from_bytes_round_trips_membership(keys in prop::collection::vec("[a-zA-Z0-9/:_-]{1,64}", 1..=100)) {
        let filter = RotatingBloomFilter::new(1_000, 0.01, 4);
        for key in &keys {
            filter.insert(key);
        }
        let image = filter.to_bytes();

        let restored = RotatingBloomFilter::new(1_000, 0.01, 4);
        restored.load_from_bytes(&image).unwrap();

        for key in &keys {
            prop_assert!(restored.probably_contains(key));
        }
    }

    #[test]
    fn a_corrupted_checksum_is_always_rejected(keys in prop::collection::vec("[a-zA-Z0-9]{1,32}", 1..=20), flip_byte in 0usize..20) {
        let filter = RotatingBloomFilter::new(1_000, 0.01, 4);
        for key in &keys {
            filter.insert(key);
        }
        let mut image = filter.to_bytes();
        let idx = flip_byte.min(image.len() - 1);
        image[idx] ^= 0xFF;

        let restored = RotatingBloomFilter::new(1_000, 0.01, 4);
        prop_assert!(restored.load_from_bytes(&image).is_err());
    }
}
