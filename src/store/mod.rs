//! Store Module
//!
//! Thread-safe in-memory mapping from string keys to entries.
//!
//! ## Responsibilities
//! - Put/Get/Delete/Keys, linearizable per key
//! - Independent keys never contend on a single global lock
//! - Serve both live request traffic and full-table scans for snapshots
//!
//! ## Data Structure Choice
//! A fixed array of `RwLock<HashMap>` shards. A key always hashes to the
//! same shard, so per-key ordering follows from the shard lock; there is no
//! store-wide lock and therefore no whole-store consistent cut.

mod sharded;

use bytes::Bytes;

pub use sharded::{ConcurrentStore, DEFAULT_SHARD_COUNT};

/// A stored object: payload bytes plus their content-type label
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    /// Opaque payload, never interpreted by the store
    pub payload: Bytes,

    /// Caller-supplied label, typically a media type
    pub content_type: String,
}

impl Entry {
    /// Create a new entry
    pub fn new(payload: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            content_type: content_type.into(),
        }
    }

    /// Approximate in-memory size in bytes
    pub fn size(&self) -> usize {
        self.payload.len() + self.content_type.len()
    }
}
