//! Snapshot Manager
//!
//! Moves the full contents of a [`ConcurrentStore`] to and from one bucket
//! of a snapshot file.
//!
//! ## Responsibilities
//! - Save: replace the bucket with the store's current entries in a single
//!   write transaction
//! - Load: decode every entry of the bucket into a fresh store
//! - Report entry counts and timings for logging

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{Result, StashError};
use crate::store::ConcurrentStore;

use super::codec::{decode_entry, encode_entry};
use super::file::{OpenMode, SnapshotFile};

/// Outcome of a load, save, or inspect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    /// Number of entries transferred
    pub entries: u64,

    /// Sum of payload sizes (content types excluded)
    pub payload_bytes: u64,

    /// Wall-clock time spent
    pub elapsed: Duration,
}

/// Loads and saves a store through one snapshot file bucket
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    path: PathBuf,
    bucket: String,
}

impl SnapshotManager {
    /// Create a manager for `bucket` inside the file at `path`
    pub fn new(path: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            bucket: bucket.into(),
        }
    }

    /// Create a manager from the snapshot settings of `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.snapshot_path, &config.snapshot_bucket)
    }

    /// Write every entry of `store` to the snapshot file
    ///
    /// Steps (one write transaction):
    /// 1. Delete the bucket if it exists
    /// 2. Create it empty
    /// 3. For each key from `keys()`, `get` and encode its entry
    /// 4. Commit
    ///
    /// The store is not locked as a whole: entries put or deleted while the
    /// save runs may or may not be included. A key deleted between `keys()`
    /// and its `get` aborts the save with `KeyAbsent`. On any error nothing
    /// is committed and the file keeps its previous contents.
    pub fn save(&self, store: &ConcurrentStore) -> Result<SnapshotStats> {
        let start = Instant::now();
        let mut file = SnapshotFile::open(&self.path, OpenMode::ReadWrite)?;

        let (entries, payload_bytes) = file.update(|txn| {
            match txn.delete_bucket(&self.bucket) {
                Ok(()) | Err(StashError::MissingBucket(_)) => {}
                Err(e) => return Err(e),
            }
            let bucket = txn.create_bucket(&self.bucket)?;

            let mut entries = 0u64;
            let mut payload_bytes = 0u64;
            for key in store.keys() {
                let entry = store.get(&key).map_err(|e| {
                    tracing::error!("Key {:?} vanished during snapshot save", key);
                    e
                })?;
                payload_bytes += entry.payload.len() as u64;
                bucket.put(key.into_bytes(), encode_entry(&entry)?);
                entries += 1;
            }

            Ok((entries, payload_bytes))
        })?;

        let stats = SnapshotStats {
            entries,
            payload_bytes,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            "Saved {} entries ({} payload bytes) to {} in {:?}",
            stats.entries,
            stats.payload_bytes,
            self.path.display(),
            stats.elapsed
        );

        Ok(stats)
    }

    /// Populate `store` from the snapshot file
    ///
    /// Fails if the file cannot be opened, if the bucket does not exist, or
    /// if any entry fails to decode (`Corrupt`). Entries decoded before a
    /// failure remain in `store`; callers should discard it on error.
    pub fn load(&self, store: &ConcurrentStore) -> Result<SnapshotStats> {
        let start = Instant::now();
        let file = SnapshotFile::open(&self.path, OpenMode::ReadOnly)?;

        let (entries, payload_bytes) = file.view(|txn| {
            let bucket = txn
                .bucket(&self.bucket)
                .ok_or_else(|| StashError::MissingBucket(self.bucket.clone()))?;

            let mut entries = 0u64;
            let mut payload_bytes = 0u64;
            for (key, value) in bucket.iter() {
                let key = std::str::from_utf8(key)
                    .map_err(|e| StashError::Corrupt(format!("key is not UTF-8: {}", e)))?;
                let entry = decode_entry(value).map_err(|e| {
                    tracing::warn!("Failed to decode entry for key {:?}: {}", key, e);
                    e
                })?;
                payload_bytes += entry.payload.len() as u64;
                store.put(key, entry.payload, entry.content_type);
                entries += 1;
            }

            Ok((entries, payload_bytes))
        })?;

        let stats = SnapshotStats {
            entries,
            payload_bytes,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            "Loaded {} entries ({} payload bytes) from {} in {:?}",
            stats.entries,
            stats.payload_bytes,
            self.path.display(),
            stats.elapsed
        );

        Ok(stats)
    }

    /// Verify the snapshot bucket without touching any store
    ///
    /// Decodes every entry; fails exactly when `load` would.
    pub fn inspect(&self) -> Result<SnapshotStats> {
        let start = Instant::now();
        let file = SnapshotFile::open(&self.path, OpenMode::ReadOnly)?;

        let (entries, payload_bytes) = file.view(|txn| {
            let bucket = txn
                .bucket(&self.bucket)
                .ok_or_else(|| StashError::MissingBucket(self.bucket.clone()))?;

            let mut payload_bytes = 0u64;
            for (key, value) in bucket.iter() {
                std::str::from_utf8(key)
                    .map_err(|e| StashError::Corrupt(format!("key is not UTF-8: {}", e)))?;
                payload_bytes += decode_entry(value)?.payload.len() as u64;
            }

            Ok((bucket.len() as u64, payload_bytes))
        })?;

        Ok(SnapshotStats {
            entries,
            payload_bytes,
            elapsed: start.elapsed(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}
