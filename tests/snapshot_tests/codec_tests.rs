//! Tests for the entry codec
//!
//! These tests verify:
//! - Exact byte layout (u16 LE length, content type, payload)
//! - Round-trip for empty and non-empty fields
//! - Truncated input is reported as Corrupt, never a panic
//! - Oversized content types are rejected at encode time

use proptest::prelude::*;
use stashkv::snapshot::codec::{
    decode_entry, encode_entry, encoded_len, LEN_PREFIX_SIZE, MAX_CONTENT_TYPE_LEN,
};
use stashkv::{Entry, StashError};

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_encode_layout() {
    let entry = Entry::new(vec![0xAAu8, 0xBB], "type");

    let bytes = encode_entry(&entry).unwrap();

    assert_eq!(bytes, vec![4, 0, b't', b'y', b'p', b'e', 0xAA, 0xBB]);
    assert_eq!(bytes.len(), encoded_len(&entry));
}

#[test]
fn test_encode_empty_entry() {
    let entry = Entry::default();

    let bytes = encode_entry(&entry).unwrap();

    assert_eq!(bytes, vec![0, 0]);
    assert_eq!(bytes.len(), LEN_PREFIX_SIZE);
}

#[test]
fn test_length_prefix_is_little_endian() {
    let content_type = "x".repeat(0x0102);
    let entry = Entry::new(Vec::<u8>::new(), content_type);

    let bytes = encode_entry(&entry).unwrap();

    assert_eq!(&bytes[..2], &[0x02, 0x01]);
}

// =============================================================================
// Round-trip Tests
// =============================================================================

#[test]
fn test_round_trip_data_set() {
    let data_set = [
        Entry::new(Vec::<u8>::new(), ""),
        Entry::new(vec![1u8, 2, 3, 4], "type"),
        Entry::new(Vec::<u8>::new(), "text"),
        Entry::new(vec![4u8, 4, 4], ""),
    ];

    for entry in data_set {
        let decoded = decode_entry(&encode_entry(&entry).unwrap()).unwrap();
        assert_eq!(decoded, entry);
    }
}

#[test]
fn test_round_trip_max_content_type() {
    let entry = Entry::new(vec![9u8; 16], "c".repeat(MAX_CONTENT_TYPE_LEN));

    let decoded = decode_entry(&encode_entry(&entry).unwrap()).unwrap();

    assert_eq!(decoded, entry);
}

#[test]
fn test_decode_does_not_borrow_input() {
    let entry = Entry::new(vec![7u8; 8], "t");
    let mut bytes = encode_entry(&entry).unwrap();

    let decoded = decode_entry(&bytes).unwrap();
    bytes.iter_mut().for_each(|b| *b = 0);

    assert_eq!(decoded, entry);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_decode_declared_length_exceeds_input() {
    // Declares 8 content-type bytes but only 2 follow
    let mut bytes = vec![0u8; 4];
    bytes[..2].copy_from_slice(&8u16.to_le_bytes());

    assert!(matches!(decode_entry(&bytes), Err(StashError::Corrupt(_))));
}

#[test]
fn test_decode_too_short_for_prefix() {
    assert!(matches!(decode_entry(&[]), Err(StashError::Corrupt(_))));
    assert!(matches!(decode_entry(&[5]), Err(StashError::Corrupt(_))));
}

#[test]
fn test_decode_invalid_utf8_content_type() {
    let bytes = vec![2, 0, 0xFF, 0xFE, 1, 2, 3];

    assert!(matches!(decode_entry(&bytes), Err(StashError::Corrupt(_))));
}

#[test]
fn test_encode_rejects_oversized_content_type() {
    let entry = Entry::new(Vec::<u8>::new(), "c".repeat(MAX_CONTENT_TYPE_LEN + 1));

    match encode_entry(&entry) {
        Err(StashError::ContentTypeTooLong { len }) => {
            assert_eq!(len, MAX_CONTENT_TYPE_LEN + 1)
        }
        other => panic!("expected ContentTypeTooLong, got {:?}", other),
    }
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn prop_round_trip(
        payload in proptest::collection::vec(any::<u8>(), 0..512),
        content_type in ".{0,64}",
    ) {
        let entry = Entry::new(payload, content_type);
        let bytes = encode_entry(&entry).unwrap();

        prop_assert_eq!(bytes.len(), encoded_len(&entry));
        prop_assert_eq!(decode_entry(&bytes).unwrap(), entry);
    }

    #[test]
    fn prop_truncation_below_content_type_is_corrupt(
        payload in proptest::collection::vec(any::<u8>(), 0..64),
        content_type in "[a-z/]{1,64}",
        cut in any::<prop::sample::Index>(),
    ) {
        let entry = Entry::new(payload, content_type);
        let bytes = encode_entry(&entry).unwrap();
        let needed = LEN_PREFIX_SIZE + entry.content_type.len();

        let truncated = &bytes[..cut.index(needed)];

        prop_assert!(matches!(decode_entry(truncated), Err(StashError::Corrupt(_))));
    }

    #[test]
    fn prop_decode_arbitrary_bytes_never_panics(
        bytes in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        let _ = decode_entry(&bytes);
    }
}
