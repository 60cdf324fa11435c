//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/put/delete operations
//! - Request validation (keys, content type, object size)
//! - Command execution
//! - Snapshot restore on open and save on shutdown
//! - Concurrent access patterns

use std::fs;
use std::sync::Arc;
use std::thread;

use stashkv::config::Config;
use stashkv::engine::Engine;
use stashkv::protocol::Command;
use stashkv::snapshot::decode_entry;
use stashkv::{ConcurrentStore, Entry, SnapshotManager, StashError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_in(temp_dir: &TempDir) -> Config {
    Config::builder()
        .snapshot_path(temp_dir.path().join("stash.db"))
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_in(&temp_dir)).unwrap();
    (temp_dir, engine)
}

fn text(payload: &str) -> Entry {
    Entry::new(payload.as_bytes().to_vec(), "text/plain")
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_without_snapshot_starts_empty() {
    let (temp, engine) = setup_temp_engine();

    assert!(engine.keys().is_empty());
    // Opening never creates the file; only save does
    assert!(!temp.path().join("stash.db").exists());
}

#[test]
fn test_engine_put_get() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("hello", text("world")).unwrap();
    let entry = engine.get("hello").unwrap();

    assert_eq!(&entry.payload[..], b"world");
    assert_eq!(entry.content_type, "text/plain");
}

#[test]
fn test_engine_get_nonexistent_key() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(engine.get("nonexistent"), Err(StashError::KeyAbsent)));
}

#[test]
fn test_engine_put_overwrites() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("key", text("v1")).unwrap();
    engine
        .put("key", Entry::new(vec![1u8, 2], "application/octet-stream"))
        .unwrap();

    let entry = engine.get("key").unwrap();
    assert_eq!(&entry.payload[..], &[1, 2]);
    assert_eq!(entry.content_type, "application/octet-stream");
    assert_eq!(engine.keys(), vec!["key"]);
}

#[test]
fn test_engine_delete() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("key", text("value")).unwrap();
    engine.delete("key").unwrap();

    assert!(matches!(engine.get("key"), Err(StashError::KeyAbsent)));
    assert!(matches!(engine.delete("key"), Err(StashError::KeyAbsent)));
}

#[test]
fn test_engine_empty_payload_is_allowed() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("empty", Entry::new(Vec::<u8>::new(), "text/plain")).unwrap();

    assert!(engine.get("empty").unwrap().payload.is_empty());
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_engine_rejects_invalid_keys() {
    let (_temp, engine) = setup_temp_engine();
    let too_long = "a".repeat(101);

    for key in ["", "has space", "dash-key", "slash/key", "ünïcode", too_long.as_str()] {
        assert!(
            matches!(engine.put(key, text("v")), Err(StashError::InvalidKey(_))),
            "put accepted {:?}",
            key
        );
        assert!(matches!(engine.get(key), Err(StashError::InvalidKey(_))));
        assert!(matches!(engine.delete(key), Err(StashError::InvalidKey(_))));
    }
    assert!(engine.keys().is_empty());
}

#[test]
fn test_engine_accepts_boundary_keys() {
    let (_temp, engine) = setup_temp_engine();

    for key in ["0", "Z", "abcXYZ0189", "a".repeat(100).as_str()] {
        engine.put(key, text("v")).unwrap();
    }
    assert_eq!(engine.keys().len(), 4);
}

#[test]
fn test_engine_custom_max_key_len() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .snapshot_path(temp_dir.path().join("stash.db"))
        .max_key_len(4)
        .build();
    let engine = Engine::open(config).unwrap();

    engine.put("abcd", text("v")).unwrap();
    assert!(matches!(
        engine.put("abcde", text("v")),
        Err(StashError::InvalidKey(_))
    ));
}

#[test]
fn test_engine_rejects_missing_content_type() {
    let (_temp, engine) = setup_temp_engine();

    let result = engine.put("key", Entry::new(b"v".to_vec(), ""));

    assert!(matches!(result, Err(StashError::MissingContentType)));
    assert!(result.unwrap_err().is_bad_request());
    assert!(engine.keys().is_empty());
}

#[test]
fn test_engine_rejects_oversized_content_type() {
    let (_temp, engine) = setup_temp_engine();

    let result = engine.put("key", Entry::new(b"v".to_vec(), "x".repeat(70_000)));

    assert!(matches!(result, Err(StashError::ContentTypeTooLong { .. })));
}

#[test]
fn test_engine_rejects_oversized_object() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .snapshot_path(temp_dir.path().join("stash.db"))
        .max_object_size(16)
        .build();
    let engine = Engine::open(config).unwrap();

    engine.put("fits", Entry::new(vec![0u8; 16], "t")).unwrap();
    match engine.put("big", Entry::new(vec![0u8; 17], "t")) {
        Err(StashError::ObjectTooLarge { size, max }) => {
            assert_eq!(size, 17);
            assert_eq!(max, 16);
        }
        other => panic!("expected ObjectTooLarge, got {:?}", other),
    }
    assert!(matches!(engine.get("big"), Err(StashError::KeyAbsent)));
}

#[test]
fn test_engine_open_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .snapshot_path(temp_dir.path().join("stash.db"))
        .store_shards(0)
        .build();

    assert!(matches!(Engine::open(config), Err(StashError::Config(_))));
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_execute_put_get_delete() {
    let (_temp, engine) = setup_temp_engine();

    let put = engine
        .execute(Command::Put {
            key: "key".to_string(),
            entry: Entry::new(b"value".to_vec(), "text/plain"),
        })
        .unwrap();
    assert_eq!(put, None);

    let got = engine
        .execute(Command::Get {
            key: "key".to_string(),
        })
        .unwrap()
        .expect("GET returns a payload");
    assert_eq!(decode_entry(&got).unwrap(), text("value"));

    engine
        .execute(Command::Delete {
            key: "key".to_string(),
        })
        .unwrap();
    assert!(matches!(
        engine.execute(Command::Get {
            key: "key".to_string()
        }),
        Err(StashError::KeyAbsent)
    ));
}

#[test]
fn test_execute_keys() {
    let (_temp, engine) = setup_temp_engine();
    engine.put("b", text("2")).unwrap();
    engine.put("a", text("1")).unwrap();

    let payload = engine.execute(Command::Keys).unwrap().unwrap();
    let mut keys: Vec<String> = bincode::deserialize(&payload).unwrap();
    keys.sort();

    assert_eq!(keys, vec!["a", "b"]);
}

#[test]
fn test_execute_ping() {
    let (_temp, engine) = setup_temp_engine();

    let result = engine.execute(Command::Ping).unwrap();

    assert_eq!(result, Some(b"PONG".to_vec()));
}

// =============================================================================
// Snapshot Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_save_then_reopen_restores_objects() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(config_in(&temp_dir)).unwrap();
        engine
            .put("k1", Entry::new(vec![0u8, 2, 4, 1, 4], "type1"))
            .unwrap();
        engine.put("k2", text("")).unwrap();
        let stats = engine.save().unwrap();
        assert_eq!(stats.entries, 2);
    }

    let engine = Engine::open(config_in(&temp_dir)).unwrap();
    let mut keys = engine.keys();
    keys.sort();
    assert_eq!(keys, vec!["k1", "k2"]);
    assert_eq!(
        engine.get("k1").unwrap(),
        Entry::new(vec![0u8, 2, 4, 1, 4], "type1")
    );
    assert!(engine.get("k2").unwrap().payload.is_empty());
}

#[test]
fn test_engine_save_drops_deleted_objects() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(config_in(&temp_dir)).unwrap();
        engine.put("keep", text("1")).unwrap();
        engine.put("gone", text("2")).unwrap();
        engine.save().unwrap();
        engine.delete("gone").unwrap();
        engine.save().unwrap();
    }

    let engine = Engine::open(config_in(&temp_dir)).unwrap();
    assert_eq!(engine.keys(), vec!["keep"]);
}

#[test]
fn test_engine_open_loads_externally_written_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);

    let store = ConcurrentStore::new();
    store.put("seeded", b"data".to_vec(), "text/plain");
    SnapshotManager::from_config(&config).save(&store).unwrap();

    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.get("seeded").unwrap(), text("data"));
}

#[test]
fn test_engine_open_corrupt_snapshot_starts_empty() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stash.db");
    fs::write(&path, b"garbage that is not a snapshot").unwrap();

    let engine = Engine::open(config_in(&temp_dir)).unwrap();

    assert!(engine.keys().is_empty());
    // The unreadable file is left for inspection
    assert_eq!(fs::read(&path).unwrap(), b"garbage that is not a snapshot");
}

#[test]
fn test_engine_open_snapshot_without_bucket_starts_empty() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);

    // Same file, different bucket
    let store = ConcurrentStore::new();
    store.put("other", b"x".to_vec(), "t");
    SnapshotManager::new(&config.snapshot_path, "elsewhere")
        .save(&store)
        .unwrap();

    let engine = Engine::open(config).unwrap();
    assert!(engine.keys().is_empty());
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_engine_concurrent_puts_then_save() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for j in 0..50 {
                    engine
                        .put(&format!("t{}k{}", i, j), text(&format!("{}-{}", i, j)))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.keys().len(), 400);
    let stats = engine.save().unwrap();
    assert_eq!(stats.entries, 400);
}
