//! # StashKV
//!
//! An in-process object store with:
//! - Opaque byte payloads plus a content-type label under string keys
//! - Lock-striped concurrent in-memory map, linearizable per key
//! - Whole-store snapshots to a single transactional file
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │             (Acceptor + Worker Thread Pool)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │         (Request Validation / Command Dispatch)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐  load / save ┌─────────────┐
//!   │ Concurrent  │◄────────────►│  Snapshot   │
//!   │   Store     │              │  Manager    │
//!   │ (sharded)   │              └──────┬──────┘
//!   └─────────────┘                     │
//!                                       ▼
//!                               ┌─────────────┐
//!                               │ Snapshot    │
//!                               │ File (STKV) │
//!                               └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod engine;
pub mod network;
pub mod protocol;
pub mod snapshot;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::Engine;
pub use error::{Result, StashError};
pub use snapshot::{SnapshotManager, SnapshotStats};
pub use store::{ConcurrentStore, Entry};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StashKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
