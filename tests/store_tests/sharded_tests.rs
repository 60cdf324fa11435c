//! ConcurrentStore Tests
//!
//! Tests verify:
//! - Put/Get/Delete semantics and KeyAbsent
//! - Keys completeness
//! - Shard configuration
//! - Concurrent access patterns

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;

use stashkv::store::{ConcurrentStore, Entry, DEFAULT_SHARD_COUNT};
use stashkv::StashError;

fn sorted(mut keys: Vec<String>) -> Vec<String> {
    keys.sort();
    keys
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_store_is_empty() {
    let store = ConcurrentStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
    assert!(store.keys().is_empty());
    assert_eq!(store.shard_count(), DEFAULT_SHARD_COUNT);
}

#[test]
fn test_put_and_get() {
    let cases: &[(&str, &[u8], &str)] = &[
        ("key", b"", ""),
        ("0", &[1, 2, 1, 2], "type"),
        ("asdf1234", &[123, 200, 6], "nums"),
    ];

    for (key, payload, content_type) in cases {
        let store = ConcurrentStore::new();
        store.put(*key, payload.to_vec(), *content_type);

        let entry = store.get(key).unwrap();
        assert_eq!(entry, Entry::new(payload.to_vec(), *content_type));
        assert_eq!(store.len(), 1);
    }
}

#[test]
fn test_get_nonexistent_key() {
    let store = ConcurrentStore::new();
    assert!(matches!(store.get("missing"), Err(StashError::KeyAbsent)));
}

#[test]
fn test_put_multiple_keys() {
    let store = ConcurrentStore::new();

    store.put("key1", Bytes::new(), "");
    store.put("key2", Bytes::new(), "");

    assert_eq!(store.len(), 2);
    assert!(store.get("key1").is_ok());
    assert!(store.get("key2").is_ok());
}

#[test]
fn test_put_overwrites_existing() {
    let store = ConcurrentStore::new();

    store.put("key", Bytes::new(), "");
    store.put("key", vec![1u8, 2, 3, 4], "type");

    assert_eq!(store.len(), 1);
    let entry = store.get("key").unwrap();
    assert_eq!(&entry.payload[..], &[1, 2, 3, 4]);
    assert_eq!(entry.content_type, "type");
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_nonexistent_key() {
    let store = ConcurrentStore::new();
    assert!(matches!(store.delete("key"), Err(StashError::KeyAbsent)));
    assert!(store.is_empty());
}

#[test]
fn test_delete_removes_entry() {
    let store = ConcurrentStore::new();

    store.put("key", Bytes::new(), "");
    store.delete("key").unwrap();

    assert!(store.is_empty());
    assert!(matches!(store.get("key"), Err(StashError::KeyAbsent)));
    // Second delete finds nothing
    assert!(matches!(store.delete("key"), Err(StashError::KeyAbsent)));
}

#[test]
fn test_put_after_delete() {
    let store = ConcurrentStore::new();

    store.put("key", b"v1".to_vec(), "a");
    store.delete("key").unwrap();
    store.put("key", b"v2".to_vec(), "b");

    assert_eq!(store.get("key").unwrap(), Entry::new(b"v2".to_vec(), "b"));
}

// =============================================================================
// Keys Tests
// =============================================================================

#[test]
fn test_keys_lists_live_entries() {
    let store = ConcurrentStore::new();

    for key in ["key1", "key2", "key3"] {
        store.put(key, Bytes::new(), "");
    }
    assert_eq!(sorted(store.keys()), vec!["key1", "key2", "key3"]);

    store.delete("key2").unwrap();
    store.put("key1", b"again".to_vec(), "x");
    assert_eq!(sorted(store.keys()), vec!["key1", "key3"]);
}

#[test]
fn test_keys_has_no_duplicates_across_many_keys() {
    let store = ConcurrentStore::with_shards(4);

    for i in 0..500 {
        store.put(format!("key{}", i), Bytes::new(), "");
    }
    for i in 0..500 {
        store.put(format!("key{}", i), vec![1u8], "overwritten");
    }

    let keys = store.keys();
    let unique: HashSet<_> = keys.iter().collect();
    assert_eq!(keys.len(), 500);
    assert_eq!(unique.len(), 500);
}

// =============================================================================
// Shard Configuration Tests
// =============================================================================

#[test]
fn test_single_shard_store() {
    let store = ConcurrentStore::with_shards(1);
    assert_eq!(store.shard_count(), 1);

    store.put("a", b"1".to_vec(), "t");
    store.put("b", b"2".to_vec(), "t");
    assert_eq!(sorted(store.keys()), vec!["a", "b"]);
}

#[test]
fn test_zero_shards_rounds_up_to_one() {
    let store = ConcurrentStore::with_shards(0);
    assert_eq!(store.shard_count(), 1);
    store.put("a", Bytes::new(), "");
    assert!(store.get("a").is_ok());
}

#[test]
fn test_large_payload() {
    let store = ConcurrentStore::new();
    let large = vec![0xABu8; 1024 * 1024];

    store.put("big", large.clone(), "application/octet-stream");

    let entry = store.get("big").unwrap();
    assert_eq!(entry.payload.len(), 1024 * 1024);
    assert_eq!(&entry.payload[..], large.as_slice());
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_concurrent_disjoint_puts() {
    let store = Arc::new(ConcurrentStore::new());

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for j in 0..100 {
                    store.put(
                        format!("key{}x{}", i, j),
                        format!("value{}x{}", i, j).into_bytes(),
                        "text/plain",
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 1000);
    for i in 0..10 {
        for j in 0..100 {
            let entry = store.get(&format!("key{}x{}", i, j)).unwrap();
            assert_eq!(&entry.payload[..], format!("value{}x{}", i, j).as_bytes());
        }
    }
}

#[test]
fn test_concurrent_reads() {
    let store = Arc::new(ConcurrentStore::new());
    store.put("key", b"value".to_vec(), "text/plain");

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..100 {
                    let entry = store.get("key").unwrap();
                    assert_eq!(&entry.payload[..], b"value");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_put_delete_same_key() {
    let store = Arc::new(ConcurrentStore::new());

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..1000u32 {
                store.put("shared", i.to_le_bytes().to_vec(), "u32");
            }
        })
    };
    let deleter = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..1000 {
                match store.delete("shared") {
                    Ok(()) | Err(StashError::KeyAbsent) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        })
    };

    writer.join().unwrap();
    deleter.join().unwrap();

    // Whatever interleaving happened, the key is either present with a
    // complete entry or absent
    match store.get("shared") {
        Ok(entry) => {
            assert_eq!(entry.content_type, "u32");
            assert_eq!(entry.payload.len(), 4);
        }
        Err(StashError::KeyAbsent) => {}
        Err(e) => panic!("unexpected error: {}", e),
    }
    assert!(store.len() <= 1);
}
