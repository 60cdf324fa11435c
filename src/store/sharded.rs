//! Lock-striped store implementation
//!
//! HashMap shards, each behind a parking_lot RwLock.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;

use bytes::Bytes;
use parking_lot::RwLock;

use super::Entry;
use crate::error::{Result, StashError};

/// Shard count used by [`ConcurrentStore::new`]
pub const DEFAULT_SHARD_COUNT: usize = 32;

/// Concurrent key → entry map
///
/// ## Concurrency:
/// - Each shard is protected by its own RwLock (many readers, one writer)
/// - Operations on keys in different shards never block each other
/// - `keys()` locks one shard at a time; it is not a consistent cut
pub struct ConcurrentStore {
    shards: Box<[RwLock<HashMap<String, Entry>>]>,
    hasher: RandomState,
}

impl ConcurrentStore {
    /// Create an empty store with the default shard count
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT)
    }

    /// Create an empty store with `count` shards (at least one)
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    /// Insert or overwrite the entry under `key`
    pub fn put(
        &self,
        key: impl Into<String>,
        payload: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) {
        let key = key.into();
        let entry = Entry::new(payload, content_type);
        self.shard(&key).write().insert(key, entry);
    }

    /// Get the entry under `key`
    ///
    /// Returns `Err(KeyAbsent)` if no entry exists. The payload is
    /// reference-counted, so the clone does not copy the bytes.
    pub fn get(&self, key: &str) -> Result<Entry> {
        self.shard(key)
            .read()
            .get(key)
            .cloned()
            .ok_or(StashError::KeyAbsent)
    }

    /// Remove the entry under `key`
    ///
    /// Returns `Err(KeyAbsent)` if there was nothing to remove.
    pub fn delete(&self, key: &str) -> Result<()> {
        match self.shard(key).write().remove(key) {
            Some(_) => Ok(()),
            None => Err(StashError::KeyAbsent),
        }
    }

    /// List all keys currently present, in no particular order
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.len());
        for shard in self.shards.iter() {
            keys.extend(shard.read().keys().cloned());
        }
        keys
    }

    /// Number of entries (sum over shards, not a consistent cut)
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Check if the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Number of lock stripes
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, key: &str) -> &RwLock<HashMap<String, Entry>> {
        let index = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[index]
    }
}

impl Default for ConcurrentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConcurrentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentStore")
            .field("shards", &self.shards.len())
            .field("len", &self.len())
            .finish()
    }
}
