//! Configuration for StashKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StashError};

/// Default snapshot file name (relative to the working directory)
pub const DEFAULT_SNAPSHOT_FILE: &str = "stashkv.db";

/// Default name of the bucket holding all entries inside the snapshot file
pub const DEFAULT_SNAPSHOT_BUCKET: &str = "objects";

/// Main configuration for a StashKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// Snapshot file loaded at startup and replaced at shutdown.
    ///
    /// Saving creates `{snapshot_path}.lock` and `{snapshot_path}.tmp` next
    /// to it, so the directory must be writable. Loading also uses the lock
    /// file, but falls back to an existing read-only one, or to no lock at
    /// all, when the directory is not writable.
    pub snapshot_path: PathBuf,

    /// Bucket inside the snapshot file that holds the store's entries
    pub snapshot_bucket: String,

    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Number of lock stripes in the in-memory store
    pub store_shards: usize,

    // -------------------------------------------------------------------------
    // Request Limits
    // -------------------------------------------------------------------------
    /// Longest accepted key (keys are `[0-9a-zA-Z]{1,max_key_len}`)
    pub max_key_len: usize,

    /// Largest accepted object payload (in bytes)
    pub max_object_size: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections (one worker thread each)
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    /// How long shutdown waits for open connections to finish before
    /// closing them (milliseconds)
    pub shutdown_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_FILE),
            snapshot_bucket: DEFAULT_SNAPSHOT_BUCKET.to_string(),
            store_shards: 32,
            max_key_len: 100,
            max_object_size: 1_000_000,
            listen_addr: "127.0.0.1:8080".to_string(),
            max_connections: 64,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            shutdown_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.store_shards == 0 {
            return Err(StashError::Config("store_shards must be at least 1".into()));
        }
        if self.max_connections == 0 {
            return Err(StashError::Config(
                "max_connections must be at least 1".into(),
            ));
        }
        if self.max_key_len == 0 {
            return Err(StashError::Config("max_key_len must be at least 1".into()));
        }
        if self.snapshot_bucket.is_empty() {
            return Err(StashError::Config("snapshot_bucket must not be empty".into()));
        }
        if self.snapshot_bucket.len() > u16::MAX as usize {
            return Err(StashError::Config("snapshot_bucket name is too long".into()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the snapshot file path
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = path.into();
        self
    }

    /// Set the snapshot bucket name
    pub fn snapshot_bucket(mut self, name: impl Into<String>) -> Self {
        self.config.snapshot_bucket = name.into();
        self
    }

    /// Set the number of store shards
    pub fn store_shards(mut self, count: usize) -> Self {
        self.config.store_shards = count;
        self
    }

    /// Set the maximum key length
    pub fn max_key_len(mut self, len: usize) -> Self {
        self.config.max_key_len = len;
        self
    }

    /// Set the maximum object size (in bytes)
    pub fn max_object_size(mut self, size: usize) -> Self {
        self.config.max_object_size = size;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the shutdown grace period (in milliseconds)
    pub fn shutdown_timeout_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
