//! Engine Module
//!
//! Coordinates the in-memory store and its snapshot file.
//!
//! ## Responsibilities
//! - Load the snapshot into a fresh store on startup
//! - Validate requests before they reach the store
//! - Route commands to store operations
//! - Save the store to the snapshot file on shutdown

use crate::config::Config;
use crate::error::{Result, StashError};
use crate::protocol::Command;
use crate::snapshot::{encode_entry, SnapshotManager, SnapshotStats};
use crate::store::{ConcurrentStore, Entry};

/// The main object-store engine
///
/// ## Concurrency Model
///
/// All methods take `&self`; the engine is shared across connection
/// workers behind an `Arc`. Concurrency control lives entirely in the
/// store's shard locks. `save` reads the store key by key without a global
/// lock, so writes that race with it may or may not reach the snapshot.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Live object store
    store: ConcurrentStore,

    /// Snapshot file access
    snapshots: SnapshotManager,
}

impl Engine {
    /// Open an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config
    /// 2. Load the snapshot into a fresh store
    /// 3. If loading fails for any reason, log it and start empty
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let snapshots = SnapshotManager::from_config(&config);
        let mut store = ConcurrentStore::with_shards(config.store_shards);

        match snapshots.load(&store) {
            Ok(stats) => {
                tracing::info!("Restored {} entries from snapshot", stats.entries);
            }
            Err(e) => {
                tracing::warn!(
                    "Skipping snapshot load from {}: {}",
                    snapshots.path().display(),
                    e
                );
                // Drop anything a failed load managed to insert
                store = ConcurrentStore::with_shards(config.store_shards);
            }
        }

        Ok(Self {
            config,
            store,
            snapshots,
        })
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers. Returned bytes are the
    /// response payload: an encoded entry for GET, a bincode key list for
    /// KEYS, `PONG` for PING.
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Get { key } => {
                let entry = self.get(&key)?;
                Ok(Some(encode_entry(&entry)?))
            }
            Command::Put { key, entry } => {
                self.put(&key, entry)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Keys => Ok(Some(bincode::serialize(&self.keys())?)),
            Command::Ping => Ok(Some(b"PONG".to_vec())),
        }
    }

    /// Get an object by key
    pub fn get(&self, key: &str) -> Result<Entry> {
        self.validate_key(key)?;
        self.store.get(key)
    }

    /// Put an object
    ///
    /// Rejects invalid keys, empty content types, and payloads over
    /// `max_object_size` before touching the store.
    pub fn put(&self, key: &str, entry: Entry) -> Result<()> {
        self.validate_key(key)?;

        if entry.content_type.is_empty() {
            return Err(StashError::MissingContentType);
        }
        if entry.content_type.len() > u16::MAX as usize {
            return Err(StashError::ContentTypeTooLong {
                len: entry.content_type.len(),
            });
        }
        if entry.payload.len() > self.config.max_object_size {
            return Err(StashError::ObjectTooLarge {
                size: entry.payload.len(),
                max: self.config.max_object_size,
            });
        }

        self.store.put(key, entry.payload, entry.content_type);
        Ok(())
    }

    /// Delete an object by key
    pub fn delete(&self, key: &str) -> Result<()> {
        self.validate_key(key)?;
        self.store.delete(key)
    }

    /// List all keys
    pub fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    /// Save the current store contents to the snapshot file
    pub fn save(&self) -> Result<SnapshotStats> {
        self.snapshots.save(&self.store)
    }

    /// Keys must be 1..=max_key_len ASCII letters or digits
    fn validate_key(&self, key: &str) -> Result<()> {
        if key.is_empty() || key.len() > self.config.max_key_len {
            return Err(StashError::InvalidKey(format!(
                "length {} not in 1..={}",
                key.len(),
                self.config.max_key_len
            )));
        }
        if !key.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(StashError::InvalidKey(format!(
                "{:?} contains characters outside [0-9a-zA-Z]",
                key
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Direct access to the live store
    pub fn store(&self) -> &ConcurrentStore {
        &self.store
    }

    /// Get the snapshot manager
    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
