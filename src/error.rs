//! Error types for StashKV
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StashError
pub type Result<T> = std::result::Result<T, StashError>;

/// Unified error type for StashKV operations
#[derive(Debug, Error)]
pub enum StashError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Key not in store")]
    KeyAbsent,

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt data: {0}")]
    Corrupt(String),

    #[error("Bucket {0:?} not present in snapshot file")]
    MissingBucket(String),

    #[error("Bucket {0:?} already exists")]
    BucketExists(String),

    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("Snapshot file is locked by another handle: {}", .0.display())]
    SnapshotLocked(PathBuf),

    #[error("Snapshot file was opened read-only")]
    ReadOnly,

    #[error("Content type is {len} bytes, exceeds the 65535 byte limit")]
    ContentTypeTooLong { len: usize },

    // -------------------------------------------------------------------------
    // Request Validation Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Missing content type")]
    MissingContentType,

    #[error("Object too large: {size} bytes (max {max})")]
    ObjectTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Payload too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StashError {
    /// True for errors caused by a malformed client request
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            StashError::InvalidKey(_)
                | StashError::MissingContentType
                | StashError::ContentTypeTooLong { .. }
        )
    }
}

impl From<bincode::Error> for StashError {
    fn from(err: bincode::Error) -> Self {
        StashError::Serialization(err.to_string())
    }
}
